// ============================================================================
// Value <-> PostgreSQL wire codec
// ============================================================================
//
// Arguments are sent in text format so the server parses them against the
// parameter type it inferred; this lets one dynamic `Value` bind to any
// column type, arrays and numerics included. Results arrive in binary
// format and are decoded by column type.
//
// ============================================================================

use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use postgres_protocol::types as wire;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::net::IpAddr;
use tokio_postgres::types::{Format, FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};

use crate::core::{IpNetwork, Value};

type BoxError = Box<dyn Error + Sync + Send>;

const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// PostgreSQL text representation of a non-null value.
pub fn to_pg_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Unsigned(u) => u.to_string(),
        Value::Float(f) => float_text(*f),
        Value::Text(s) => s.clone(),
        Value::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Inet(ip) => ip.to_string(),
        Value::Cidr(net) => net.to_string(),
        Value::Array(items) => array_literal(items),
    };
    Some(text)
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        f.to_string()
    }
}

fn array_literal(items: &[Value]) -> String {
    let elements: Vec<String> = items
        .iter()
        .map(|item| match to_pg_text(item) {
            None => "NULL".to_string(),
            Some(text) => {
                let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            }
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

impl ToSql for Value {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match to_pg_text(self) {
            None => Ok(IsNull::Yes),
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if let Kind::Array(_) = ty.kind() {
            return Ok(Value::Array(Vec::<Value>::from_sql(ty, raw)?));
        }

        let value = match *ty {
            Type::BOOL => Value::Boolean(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Integer(i16::from_sql(ty, raw)? as i64),
            Type::INT4 => Value::Integer(i32::from_sql(ty, raw)? as i64),
            Type::INT8 => Value::Integer(i64::from_sql(ty, raw)?),
            Type::OID => Value::Unsigned(u32::from_sql(ty, raw)? as u64),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)? as f64),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => numeric_from_sql(ty, raw)?,
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc()),
            Type::INET => Value::Inet(IpAddr::from_sql(ty, raw)?),
            Type::CIDR => {
                let inet = wire::inet_from_sql(raw)?;
                Value::Cidr(IpNetwork::new(inet.addr(), inet.netmask())?)
            }
            _ => Value::Text(String::from_utf8(raw.to_vec())?),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// NUMERIC via `rust_decimal`: integral values become integers, the rest
/// floats. NaN and the infinities have no decimal form and are read from the
/// sign word.
fn numeric_from_sql(ty: &Type, raw: &[u8]) -> Result<Value, BoxError> {
    match raw.get(4..6).map(|b| u16::from_be_bytes([b[0], b[1]])) {
        Some(NUMERIC_NAN) => return Ok(Value::Float(f64::NAN)),
        Some(NUMERIC_PINF) => return Ok(Value::Float(f64::INFINITY)),
        Some(NUMERIC_NINF) => return Ok(Value::Float(f64::NEG_INFINITY)),
        _ => {}
    }

    let decimal = Decimal::from_sql(ty, raw)?;
    if decimal.fract().is_zero() {
        if let Some(i) = decimal.to_i64() {
            return Ok(Value::Integer(i));
        }
        if let Some(u) = decimal.to_u64() {
            return Ok(Value::Unsigned(u));
        }
    }
    decimal
        .to_f64()
        .map(Value::Float)
        .ok_or_else(|| format!("numeric {} out of range", decimal).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const NEG: u16 = 0x4000;

    fn numeric(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    fn decode(raw: Vec<u8>) -> Value {
        numeric_from_sql(&Type::NUMERIC, &raw).unwrap()
    }

    #[test]
    fn test_text_encoding() {
        assert_eq!(to_pg_text(&Value::Null), None);
        assert_eq!(to_pg_text(&Value::Boolean(true)).unwrap(), "true");
        assert_eq!(to_pg_text(&Value::Unsigned(u64::MAX)).unwrap(), "18446744073709551615");
        assert_eq!(to_pg_text(&Value::Float(f64::NEG_INFINITY)).unwrap(), "-Infinity");
        assert_eq!(
            to_pg_text(&Value::Cidr(IpNetwork::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 8).unwrap()))
                .unwrap(),
            "10.0.0.0/8"
        );
    }

    #[test]
    fn test_array_literal_escapes() {
        let array = Value::Array(vec![
            Value::from("a\"b"),
            Value::Null,
            Value::from("c\\d"),
        ]);
        assert_eq!(to_pg_text(&array).unwrap(), r#"{"a\"b",NULL,"c\\d"}"#);
    }

    #[test]
    fn test_numeric_decoding() {
        // 12345678 = [1234, 5678], weight 1
        assert_eq!(decode(numeric(1, 0, 0, &[1234, 5678])), Value::Integer(12345678));
        // 20000 = [2], weight 1 (trailing group dropped)
        assert_eq!(decode(numeric(1, 0, 0, &[2])), Value::Integer(20000));
        // u64::MAX = 1844 6744 0737 0955 1615
        assert_eq!(
            decode(numeric(4, 0, 0, &[1844, 6744, 737, 955, 1615])),
            Value::Unsigned(u64::MAX)
        );
        assert_eq!(decode(numeric(0, NEG, 0, &[7])), Value::Integer(-7));
        // 1.5 = [1, 5000], weight 0
        assert_eq!(decode(numeric(0, 0, 1, &[1, 5000])), Value::Float(1.5));
        // 0.0005 = [5], weight -1
        assert_eq!(decode(numeric(-1, 0, 4, &[5])), Value::Float(0.0005));
        assert_eq!(decode(numeric(0, 0, 0, &[])), Value::Integer(0));
    }

    #[test]
    fn test_numeric_special_values() {
        assert!(matches!(decode(numeric(0, NUMERIC_NAN, 0, &[])), Value::Float(f) if f.is_nan()));
        assert_eq!(decode(numeric(0, NUMERIC_PINF, 0, &[])), Value::Float(f64::INFINITY));
        assert_eq!(decode(numeric(0, NUMERIC_NINF, 0, &[])), Value::Float(f64::NEG_INFINITY));
    }
}

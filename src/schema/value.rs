use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr};

use super::FieldKind;
use crate::core::{DbError, IpNetwork, Result, Value};

/// Conversion between a Rust field type and the store's `Value`.
///
/// `empty()` is the zero value used when a column is absent from a row or
/// NULL in the store.
pub trait FieldValue: Sized {
    fn kind() -> FieldKind;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
    fn empty() -> Self;
}

fn mismatch(expected: &str, value: &Value) -> DbError {
    DbError::TypeMismatch(format!(
        "Expected {}, got {} ({})",
        expected,
        value.type_name(),
        value
    ))
}

macro_rules! signed_field_value {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn to_value(&self) -> Value {
                    Value::Integer(*self as i64)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match &value {
                        Value::Null => Ok(Self::empty()),
                        Value::Integer(i) => <$ty>::try_from(*i).map_err(|_| mismatch(stringify!($ty), &value)),
                        Value::Unsigned(u) => <$ty>::try_from(*u).map_err(|_| mismatch(stringify!($ty), &value)),
                        Value::Text(s) => s.trim().parse().map_err(|_| mismatch(stringify!($ty), &value)),
                        _ => Err(mismatch(stringify!($ty), &value)),
                    }
                }

                fn empty() -> Self {
                    0
                }
            }
        )+
    };
}

macro_rules! unsigned_field_value {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn to_value(&self) -> Value {
                    Value::Unsigned(*self as u64)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match &value {
                        Value::Null => Ok(Self::empty()),
                        Value::Integer(i) => <$ty>::try_from(*i).map_err(|_| mismatch(stringify!($ty), &value)),
                        Value::Unsigned(u) => <$ty>::try_from(*u).map_err(|_| mismatch(stringify!($ty), &value)),
                        Value::Text(s) => s.trim().parse().map_err(|_| mismatch(stringify!($ty), &value)),
                        _ => Err(mismatch(stringify!($ty), &value)),
                    }
                }

                fn empty() -> Self {
                    0
                }
            }
        )+
    };
}

signed_field_value!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize);
unsigned_field_value!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize);

impl FieldValue for f64 {
    fn kind() -> FieldKind {
        FieldKind::F64
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(0.0),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("f64", &value)),
            other => other.as_f64().ok_or_else(|| mismatch("f64", &value)),
        }
    }

    fn empty() -> Self {
        0.0
    }
}

impl FieldValue for f32 {
    fn kind() -> FieldKind {
        FieldKind::F32
    }

    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }

    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }

    fn empty() -> Self {
        0.0
    }
}

impl FieldValue for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(*b),
            Value::Text(s) => match s.as_str() {
                "true" | "t" => Ok(true),
                "false" | "f" => Ok(false),
                _ => Err(mismatch("bool", &value)),
            },
            _ => Err(mismatch("bool", &value)),
        }
    }

    fn empty() -> Self {
        false
    }
}

impl FieldValue for String {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    fn empty() -> Self {
        String::new()
    }
}

impl FieldValue for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(Self::empty()),
            Value::Timestamp(ts) => Ok(*ts),
            Value::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| mismatch("timestamp", &value)),
            _ => Err(mismatch("timestamp", &value)),
        }
    }

    fn empty() -> Self {
        DateTime::<Utc>::default()
    }
}

impl FieldValue for IpAddr {
    fn kind() -> FieldKind {
        FieldKind::IpAddr
    }

    fn to_value(&self) -> Value {
        Value::Inet(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(Self::empty()),
            Value::Inet(ip) => Ok(*ip),
            Value::Cidr(net) => Ok(net.addr()),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("ip address", &value)),
            _ => Err(mismatch("ip address", &value)),
        }
    }

    fn empty() -> Self {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

impl FieldValue for IpNetwork {
    fn kind() -> FieldKind {
        FieldKind::IpNet
    }

    fn to_value(&self) -> Value {
        Value::Cidr(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(Self::empty()),
            Value::Cidr(net) => Ok(*net),
            Value::Text(s) => s.parse(),
            _ => Err(mismatch("ip network", &value)),
        }
    }

    fn empty() -> Self {
        IpNetwork::default()
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::Seq(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("array", &other)),
        }
    }

    fn empty() -> Self {
        Vec::new()
    }
}

// Maps have no column datatype; declaring one yields a skipped field.
impl<K: Eq + Hash, V> FieldValue for HashMap<K, V> {
    fn kind() -> FieldKind {
        FieldKind::Map
    }

    fn to_value(&self) -> Value {
        Value::Null
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(HashMap::new()),
            other => Err(mismatch("map", &other)),
        }
    }

    fn empty() -> Self {
        HashMap::new()
    }
}

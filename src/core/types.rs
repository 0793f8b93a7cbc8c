use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::{DbError, Result, Value};

/// Closed set of column datatypes a resource field can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    SmallInt,
    LargeInt,
    HugeInt,
    Float,
    String,
    Time,
    IpAddr,
    IpNet,
    BoolArray,
    SmallIntArray,
    LargeIntArray,
    HugeIntArray,
    FloatArray,
    StringArray,
    TimeArray,
    IpAddrArray,
    IpNetArray,
}

impl DataType {
    pub fn is_array(&self) -> bool {
        self.element() != *self
    }

    /// Scalar element type; scalars return themselves.
    pub fn element(&self) -> DataType {
        match self {
            Self::BoolArray => Self::Bool,
            Self::SmallIntArray => Self::SmallInt,
            Self::LargeIntArray => Self::LargeInt,
            Self::HugeIntArray => Self::HugeInt,
            Self::FloatArray => Self::Float,
            Self::StringArray => Self::String,
            Self::TimeArray => Self::Time,
            Self::IpAddrArray => Self::IpAddr,
            Self::IpNetArray => Self::IpNet,
            scalar => *scalar,
        }
    }

    /// Array form of a scalar; `None` for types that already are arrays.
    pub fn array_of(&self) -> Option<DataType> {
        let array = match self {
            Self::Bool => Self::BoolArray,
            Self::SmallInt => Self::SmallIntArray,
            Self::LargeInt => Self::LargeIntArray,
            Self::HugeInt => Self::HugeIntArray,
            Self::Float => Self::FloatArray,
            Self::String => Self::StringArray,
            Self::Time => Self::TimeArray,
            Self::IpAddr => Self::IpAddrArray,
            Self::IpNet => Self::IpNetArray,
            _ => return None,
        };
        Some(array)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::SmallInt => "small_int",
            Self::LargeInt => "large_int",
            Self::HugeInt => "huge_int",
            Self::Float => "float",
            Self::String => "string",
            Self::Time => "time",
            Self::IpAddr => "ip_addr",
            Self::IpNet => "ip_net",
            Self::BoolArray => "bool_array",
            Self::SmallIntArray => "small_int_array",
            Self::LargeIntArray => "large_int_array",
            Self::HugeIntArray => "huge_int_array",
            Self::FloatArray => "float_array",
            Self::StringArray => "string_array",
            Self::TimeArray => "time_array",
            Self::IpAddrArray => "ip_addr_array",
            Self::IpNetArray => "ip_net_array",
        };
        write!(f, "{}", name)
    }
}

/// An IP network in CIDR notation (`10.0.0.0/8`, `fd00::/64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self> {
        let max = max_prefix(&addr);
        if prefix > max {
            return Err(DbError::TypeMismatch(format!(
                "Prefix /{} exceeds {} bits for {}",
                prefix, max, addr
            )));
        }
        Ok(Self { addr, prefix })
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl Default for IpNetwork {
    fn default() -> Self {
        Self {
            addr: IpAddr::from([0, 0, 0, 0]),
            prefix: 0,
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for IpNetwork {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DbError::TypeMismatch(format!("Invalid IP network '{}'", s));
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
                let prefix: u8 = prefix.trim().parse().map_err(|_| invalid())?;
                Self::new(addr, prefix)
            }
            None => {
                let addr: IpAddr = s.trim().parse().map_err(|_| invalid())?;
                let prefix = max_prefix(&addr);
                Self::new(addr, prefix)
            }
        }
    }
}

pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_element_mapping() {
        assert_eq!(DataType::StringArray.element(), DataType::String);
        assert_eq!(DataType::HugeInt.array_of(), Some(DataType::HugeIntArray));
        assert!(DataType::IpNetArray.is_array());
        assert!(!DataType::IpNet.is_array());
        assert_eq!(DataType::TimeArray.array_of(), None);
    }

    #[test]
    fn test_ip_network_parse() {
        let net: IpNetwork = "10.0.0.0/8".parse().unwrap();
        assert_eq!(net.prefix(), 8);
        assert_eq!(net.to_string(), "10.0.0.0/8");

        let host: IpNetwork = "fd00::1".parse().unwrap();
        assert_eq!(host.prefix(), 128);

        assert!("10.0.0.0/33".parse::<IpNetwork>().is_err());
        assert!("nonsense".parse::<IpNetwork>().is_err());
    }
}

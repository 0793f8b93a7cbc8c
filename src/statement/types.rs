use crate::core::DataType;

/// Datatype -> PostgreSQL column type.
pub fn column_type(datatype: DataType) -> &'static str {
    match datatype {
        DataType::Bool => "boolean",
        DataType::SmallInt => "integer",
        DataType::LargeInt => "bigint",
        DataType::HugeInt => "numeric",
        DataType::Float => "double precision",
        DataType::String => "text",
        DataType::Time => "timestamp with time zone",
        DataType::IpAddr => "inet",
        DataType::IpNet => "cidr",
        DataType::BoolArray => "boolean[]",
        DataType::SmallIntArray => "integer[]",
        DataType::LargeIntArray => "bigint[]",
        DataType::HugeIntArray => "numeric[]",
        DataType::FloatArray => "double precision[]",
        DataType::StringArray => "text[]",
        DataType::TimeArray => "timestamp with time zone[]",
        DataType::IpAddrArray => "inet[]",
        DataType::IpNetArray => "cidr[]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_types_follow_scalars() {
        for scalar in [
            DataType::Bool,
            DataType::SmallInt,
            DataType::LargeInt,
            DataType::HugeInt,
            DataType::Float,
            DataType::String,
            DataType::Time,
            DataType::IpAddr,
            DataType::IpNet,
        ] {
            let array = scalar.array_of().unwrap();
            assert_eq!(column_type(array), format!("{}[]", column_type(scalar)));
        }
    }
}

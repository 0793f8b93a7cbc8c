/// Declares a resource struct and its `Resource` implementation.
///
/// The struct gets an embedded `base: ResourceBase` (identifier and creation
/// time) in addition to the declared fields. Storage tags follow `=>`:
///
/// ```ignore
/// resource! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct User as "user" {
///         pub name: String => [Unique],
///         pub age: i32 => [Positive],
///         pub zone: String => [Owner],
///         pub note: String => [Ignore],
///     }
/// }
/// ```
///
/// Every field type must implement `FieldValue`, ignored ones included.
#[macro_export]
macro_rules! resource {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $type_name:literal {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty $(=> [$($tag:ident),* $(,)?])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            pub base: $crate::schema::ResourceBase,
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::schema::Resource for $name {
            fn type_name() -> &'static str {
                $type_name
            }

            fn schema() -> $crate::schema::ResourceSchema {
                $crate::schema::ResourceSchema::new($type_name)
                    .base()
                    $(
                        .field(
                            stringify!($field),
                            <$field_ty as $crate::schema::FieldValue>::kind(),
                            &[$($($crate::schema::StorageTag::$tag),*)?],
                        )
                    )*
            }

            fn base(&self) -> &$crate::schema::ResourceBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::schema::ResourceBase {
                &mut self.base
            }

            #[allow(unused_variables)]
            fn field_value(&self, column: &str) -> Option<$crate::core::Value> {
                match column {
                    $(
                        stringify!($field) => Some(
                            <$field_ty as $crate::schema::FieldValue>::to_value(&self.$field)
                        ),
                    )*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn from_row(row: &mut $crate::schema::RowReader) -> $crate::core::Result<Self> {
                Ok(Self {
                    base: row.base()?,
                    $(
                        $field: row.field::<$field_ty>(stringify!($field))?,
                    )*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::Value;
    use crate::schema::{DescriptorBuilder, Resource, RowReader, StorageTag};
    use std::collections::HashMap;

    crate::resource! {
        #[derive(Debug, Clone, PartialEq)]
        pub struct Host as "host" {
            pub name: String => [Unique],
            pub cpus: u16 => [Positive],
            pub labels: HashMap<String, String>,
            pub note: String => [Ignore],
            pub rack: String => [Owner],
        }
    }

    #[test]
    fn test_macro_schema() {
        let schema = Host::schema();
        assert_eq!(schema.type_name(), "host");
        // base marker + five declared fields
        assert_eq!(schema.fields().len(), 6);
        assert!(schema.fields()[1].has_tag(StorageTag::Unique));

        let built = DescriptorBuilder::build(&schema).unwrap();
        assert_eq!(built.skipped.len(), 1);
        assert_eq!(built.descriptor.owners, vec!["rack"]);
    }

    #[test]
    fn test_macro_field_access_and_row() {
        let mut row = RowReader::new(
            "host",
            vec![
                ("id".to_string(), Value::from("h1")),
                ("name".to_string(), Value::from("web-1")),
                ("cpus".to_string(), Value::Integer(8)),
                ("rack".to_string(), Value::from("r1")),
            ],
        );
        let host = Host::from_row(&mut row).unwrap();

        assert_eq!(host.id(), "h1");
        assert_eq!(host.cpus, 8);
        assert!(host.note.is_empty());
        assert_eq!(host.field_value("name"), Some(Value::from("web-1")));
        assert_eq!(host.field_value("unknown"), None);
    }
}

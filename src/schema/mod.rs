pub mod descriptor;
pub mod field;
pub mod resource;
pub mod value;

pub use descriptor::{
    table_name, BuiltDescriptor, DescriptorBuilder, ResourceDescriptor, TABLE_PREFIX,
};
pub use field::{Check, FieldDecl, FieldKind, ResourceField, ResourceSchema, StorageTag};
pub use resource::{Resource, ResourceBase, RowReader, CREATE_TIME_COLUMN, ID_COLUMN};
pub use value::FieldValue;

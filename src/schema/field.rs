use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::DataType;

/// Language-level kind of a declared field, before it is mapped to a
/// column datatype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Marker for the embedded `ResourceBase`.
    Base,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
    Timestamp,
    IpAddr,
    IpNet,
    Seq(Box<FieldKind>),
    Map,
    Opaque(&'static str),
}

impl FieldKind {
    /// Fixed kind -> datatype table. `None` marks an unsupported kind.
    pub fn datatype(&self) -> Option<DataType> {
        let datatype = match self {
            Self::Bool => DataType::Bool,
            Self::I8 | Self::I16 | Self::I32 | Self::U8 | Self::U16 => DataType::SmallInt,
            Self::I64 | Self::Isize | Self::U32 => DataType::LargeInt,
            Self::U64 | Self::Usize => DataType::HugeInt,
            Self::F32 | Self::F64 => DataType::Float,
            Self::String => DataType::String,
            Self::Timestamp => DataType::Time,
            Self::IpAddr => DataType::IpAddr,
            Self::IpNet => DataType::IpNet,
            Self::Seq(element) => return element.datatype()?.array_of(),
            Self::Base | Self::Map | Self::Opaque(_) => return None,
        };
        Some(datatype)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seq(element) => write!(f, "seq<{}>", element),
            Self::Opaque(name) => write!(f, "{}", name),
            other => write!(f, "{}", format!("{:?}", other).to_lowercase()),
        }
    }
}

/// Storage tags recognized on declared fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTag {
    /// Field is not stored.
    Ignore,
    /// Field holds the identifier of the owning resource (cascading delete).
    Owner,
    /// Field holds the identifier of a referenced resource (restricted delete).
    Refer,
    /// Column-level unique constraint.
    Unique,
    /// Member of the composite unique key.
    UniqueKey,
    /// Member of the composite primary key.
    PrimaryKey,
    /// Value must be greater than zero.
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Positive,
}

/// A stored data column of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceField {
    pub name: String,
    pub datatype: DataType,
    pub unique: bool,
    pub check: Option<Check>,
}

/// One declared field of a resource schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    pub tags: Vec<StorageTag>,
}

impl FieldDecl {
    pub fn has_tag(&self, tag: StorageTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Hand-written or macro-generated description of a resource type, the
/// input of the descriptor builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    type_name: &'static str,
    fields: Vec<FieldDecl>,
}

impl ResourceSchema {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Declares the embedded resource base (identifier and creation time).
    pub fn base(mut self) -> Self {
        self.fields.push(FieldDecl {
            name: "base".to_string(),
            kind: FieldKind::Base,
            tags: Vec::new(),
        });
        self
    }

    pub fn field(mut self, name: &str, kind: FieldKind, tags: &[StorageTag]) -> Self {
        self.fields.push(FieldDecl {
            name: name.to_string(),
            kind,
            tags: tags.to_vec(),
        });
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }
}

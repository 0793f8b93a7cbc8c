// ============================================================================
// Type Descriptor Builder
// ============================================================================
//
// Turns a declared ResourceSchema into the immutable ResourceDescriptor the
// rest of the engine works on. Runs once per type at registration time.
//
// ============================================================================

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::resource::{CREATE_TIME_COLUMN, ID_COLUMN};
use super::{Check, FieldDecl, FieldKind, ResourceField, ResourceSchema, StorageTag};
use crate::core::{DataType, DbError, Result};

/// Prefix of every physical table name.
pub const TABLE_PREFIX: &str = "res_";

lazy_static! {
    static ref SNAKE_CASE: Regex = Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").unwrap();
}

pub fn is_snake_case(name: &str) -> bool {
    SNAKE_CASE.is_match(name)
}

pub fn table_name(type_name: &str) -> String {
    format!("{}{}", TABLE_PREFIX, type_name)
}

/// Structural metadata of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub type_name: String,
    pub fields: Vec<ResourceField>,
    pub primary_keys: Vec<String>,
    pub unique_keys: Vec<String>,
    pub owners: Vec<String>,
    pub refers: Vec<String>,
    pub is_relationship: bool,
}

impl ResourceDescriptor {
    pub fn table_name(&self) -> String {
        table_name(&self.type_name)
    }

    /// All physical columns in storage order: id, create_time, fields,
    /// owners, refers.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![ID_COLUMN, CREATE_TIME_COLUMN];
        columns.extend(self.fields.iter().map(|f| f.name.as_str()));
        columns.extend(self.owners.iter().map(String::as_str));
        columns.extend(self.refers.iter().map(String::as_str));
        columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_datatype(column).is_some()
    }

    pub fn field(&self, name: &str) -> Option<&ResourceField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column_datatype(&self, column: &str) -> Option<DataType> {
        if column == ID_COLUMN {
            return Some(DataType::String);
        }
        if column == CREATE_TIME_COLUMN {
            return Some(DataType::Time);
        }
        if self.owners.iter().chain(self.refers.iter()).any(|c| c == column) {
            return Some(DataType::String);
        }
        self.field(column).map(|f| f.datatype)
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.owners.iter().chain(self.refers.iter()).map(String::as_str)
    }
}

/// A descriptor plus the fields that were dropped while building it.
#[derive(Debug)]
pub struct BuiltDescriptor {
    pub descriptor: ResourceDescriptor,
    pub skipped: Vec<DbError>,
}

pub struct DescriptorBuilder;

impl DescriptorBuilder {
    /// Builds the descriptor of a declared schema.
    ///
    /// Unsupported field kinds are skipped and reported in
    /// `BuiltDescriptor::skipped`; structural problems fail the whole type.
    pub fn build(schema: &ResourceSchema) -> Result<BuiltDescriptor> {
        let resource = schema.type_name();
        let invalid = |reason: String| DbError::InvalidResource {
            resource: resource.to_string(),
            reason,
        };

        if !is_snake_case(resource) {
            return Err(invalid("type name must be lower snake case".to_string()));
        }

        let mut descriptor = ResourceDescriptor {
            type_name: resource.to_string(),
            fields: Vec::new(),
            primary_keys: Vec::new(),
            unique_keys: Vec::new(),
            owners: Vec::new(),
            refers: Vec::new(),
            is_relationship: false,
        };
        let mut skipped = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut has_base = false;

        for decl in schema.fields() {
            if decl.kind == FieldKind::Base {
                has_base = true;
                continue;
            }
            if decl.has_tag(StorageTag::Ignore) {
                continue;
            }

            let name = decl.name.as_str();
            if name == ID_COLUMN || name == CREATE_TIME_COLUMN {
                return Err(invalid(format!("field '{}' collides with an implicit field", name)));
            }
            if !is_snake_case(name) {
                return Err(invalid(format!("field '{}' is not lower snake case", name)));
            }
            if !seen.insert(name) {
                return Err(invalid(format!("field '{}' is declared twice", name)));
            }

            let is_owner = decl.has_tag(StorageTag::Owner);
            let is_refer = decl.has_tag(StorageTag::Refer);
            if is_owner || is_refer {
                if is_owner && is_refer {
                    return Err(invalid(format!(
                        "field '{}' cannot be both owner and reference",
                        name
                    )));
                }
                if decl.kind != FieldKind::String {
                    return Err(invalid(format!(
                        "reference field '{}' must hold a string identifier",
                        name
                    )));
                }
                if is_owner {
                    descriptor.owners.push(name.to_string());
                } else {
                    descriptor.refers.push(name.to_string());
                }
            } else {
                match Self::data_field(resource, decl)? {
                    Some(field) => descriptor.fields.push(field),
                    None => {
                        skipped.push(DbError::UnsupportedField {
                            resource: resource.to_string(),
                            field: name.to_string(),
                            kind: decl.kind.to_string(),
                        });
                        continue;
                    }
                }
            }

            if decl.has_tag(StorageTag::PrimaryKey) {
                descriptor.primary_keys.push(name.to_string());
            }
            if decl.has_tag(StorageTag::UniqueKey) {
                descriptor.unique_keys.push(name.to_string());
            }
        }

        if !has_base {
            return Err(invalid("type does not embed a resource base".to_string()));
        }

        descriptor.is_relationship = descriptor.fields.len() == 1
            && descriptor.owners.len() == 1
            && descriptor.refers.len() == 1;

        Ok(BuiltDescriptor {
            descriptor,
            skipped,
        })
    }

    fn data_field(resource: &str, decl: &FieldDecl) -> Result<Option<ResourceField>> {
        let Some(datatype) = decl.kind.datatype() else {
            return Ok(None);
        };

        let check = if decl.has_tag(StorageTag::Positive) {
            let numeric = matches!(
                datatype,
                DataType::SmallInt | DataType::LargeInt | DataType::HugeInt | DataType::Float
            );
            if !numeric {
                return Err(DbError::InvalidResource {
                    resource: resource.to_string(),
                    reason: format!("positive check on non-numeric field '{}'", decl.name),
                });
            }
            Some(Check::Positive)
        } else {
            None
        };

        Ok(Some(ResourceField {
            name: decl.name.clone(),
            datatype,
            unique: decl.has_tag(StorageTag::Unique),
            check,
        }))
    }
}

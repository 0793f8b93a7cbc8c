use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{FieldValue, ResourceSchema};
use crate::core::{DbError, Result, Value};

/// Column holding the resource identifier.
pub const ID_COLUMN: &str = "id";
/// Column holding the creation timestamp.
pub const CREATE_TIME_COLUMN: &str = "create_time";

/// Implicit fields every resource embeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceBase {
    pub id: String,
    pub create_time: Option<DateTime<Utc>>,
}

impl ResourceBase {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            create_time: None,
        }
    }
}

/// A typed domain entity persisted as one row of one table.
///
/// Usually implemented through [`resource!`](crate::resource); a hand-written
/// implementation must keep `schema()`, `field_value()` and `from_row()`
/// consistent with each other.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Lower-snake-case type name; also the table suffix.
    fn type_name() -> &'static str;

    fn schema() -> ResourceSchema;

    fn base(&self) -> &ResourceBase;

    fn base_mut(&mut self) -> &mut ResourceBase;

    /// Current value of a declared field, by column name.
    fn field_value(&self, column: &str) -> Option<Value>;

    fn from_row(row: &mut RowReader) -> Result<Self>;

    fn id(&self) -> &str {
        &self.base().id
    }
}

/// Column-name keyed view over one result row, consumed while a resource
/// is rebuilt from it.
#[derive(Debug)]
pub struct RowReader {
    resource: String,
    values: HashMap<String, Value>,
}

impl RowReader {
    pub fn new(resource: &str, record: Vec<(String, Value)>) -> Self {
        Self {
            resource: resource.to_string(),
            values: record.into_iter().collect(),
        }
    }

    pub fn take(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Identifier and creation time, mapped from their dedicated columns.
    pub fn base(&mut self) -> Result<ResourceBase> {
        let id = match self.take(ID_COLUMN) {
            None | Some(Value::Null) => String::new(),
            Some(Value::Text(id)) => id,
            Some(other) => {
                return Err(DbError::TypeMismatch(format!(
                    "Column 'id' of '{}' must be text, got {}",
                    self.resource,
                    other.type_name()
                )));
            }
        };

        let create_time = match self.take(CREATE_TIME_COLUMN) {
            None | Some(Value::Null) => None,
            Some(value) => Some(DateTime::<Utc>::from_value(value).map_err(|err| {
                DbError::TypeMismatch(format!(
                    "Column 'create_time' of '{}': {}",
                    self.resource, err
                ))
            })?),
        };

        Ok(ResourceBase { id, create_time })
    }

    /// Converts a named column; an absent column yields the field's zero value.
    pub fn field<T: FieldValue>(&mut self, column: &str) -> Result<T> {
        match self.take(column) {
            Some(value) => T::from_value(value).map_err(|err| {
                DbError::TypeMismatch(format!(
                    "Column '{}' of '{}': {}",
                    column, self.resource, err
                ))
            }),
            None => Ok(T::empty()),
        }
    }

    /// Columns not consumed so far.
    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use super::{Binder, Statement, quote};
use crate::core::{DbError, Result, Value};
use crate::schema::{CREATE_TIME_COLUMN, ID_COLUMN, Resource, ResourceDescriptor};

/// Builds the insert statement of one resource.
///
/// An empty identifier is replaced by a fresh UUID and a missing creation
/// time by the current time, both written back into `resource` before the
/// arguments are collected.
pub fn insert<R: Resource>(descriptor: &ResourceDescriptor, resource: &mut R) -> Result<Statement> {
    let base = resource.base_mut();
    if base.id.is_empty() {
        base.id = Uuid::new_v4().to_string();
    }
    if base.create_time.is_none() {
        // the column stores microseconds; keep the in-memory value equal
        base.create_time = Some(Utc::now().trunc_subsecs(6));
    }

    let mut binder = Binder::new();
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();

    for column in descriptor.columns() {
        let value = match column {
            ID_COLUMN => Value::Text(resource.base().id.clone()),
            CREATE_TIME_COLUMN => match resource.base().create_time {
                Some(time) => Value::Timestamp(time),
                None => Value::Null,
            },
            name => resource.field_value(name).ok_or_else(|| DbError::InvalidResource {
                resource: descriptor.type_name.clone(),
                reason: format!("no value for column '{}'", name),
            })?,
        };
        columns.push(quote(column));
        placeholders.push(binder.bind(value));
    }

    let sql = format!(
        "insert into {} ({}) values ({})",
        descriptor.table_name(),
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(binder.finish(sql))
}

use super::{Binder, Conditions, FieldValues, Statement, check_column, quote};
use crate::core::{DbError, Result};
use crate::schema::{ID_COLUMN, ResourceDescriptor};

/// `update <table> set ... [where ...]`; new values and predicates are
/// separate maps. Empty conditions update every row.
pub fn update(
    descriptor: &ResourceDescriptor,
    values: &FieldValues,
    conditions: &Conditions,
) -> Result<Statement> {
    conditions.ensure_predicates_only("update")?;
    if values.is_empty() {
        return Err(DbError::InvalidCondition("update without new values".to_string()));
    }

    let mut binder = Binder::new();
    let mut assignments = Vec::with_capacity(values.len());
    for (column, value) in values {
        check_column(descriptor, column)?;
        if column == ID_COLUMN {
            return Err(DbError::InvalidCondition(
                "the identifier of a resource cannot be updated".to_string(),
            ));
        }
        assignments.push(format!("{} = {}", quote(column), binder.bind(value.clone())));
    }

    let where_clause = conditions.where_clause(descriptor, &mut binder, None)?;
    let sql = format!(
        "update {} set {}{}",
        descriptor.table_name(),
        assignments.join(", "),
        where_clause
    );
    Ok(binder.finish(sql))
}

use super::{Binder, Conditions, Statement};
use crate::core::Result;
use crate::schema::ResourceDescriptor;

/// `delete from <table> [where ...]`. Empty conditions delete every row.
pub fn delete(descriptor: &ResourceDescriptor, conditions: &Conditions) -> Result<Statement> {
    conditions.ensure_predicates_only("delete")?;
    let mut binder = Binder::new();
    let where_clause = conditions.where_clause(descriptor, &mut binder, None)?;
    let sql = format!("delete from {}{}", descriptor.table_name(), where_clause);
    Ok(binder.finish(sql))
}

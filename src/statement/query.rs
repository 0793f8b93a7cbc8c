use super::{Binder, Conditions, Statement, quote};
use crate::core::{DbError, Result, Value};
use crate::schema::{ID_COLUMN, ResourceDescriptor};

/// `select * from <table> [where ...] order by <column, default id> [limit/offset]`.
pub fn select(descriptor: &ResourceDescriptor, conditions: &Conditions) -> Result<Statement> {
    let mut binder = Binder::new();
    let where_clause = conditions.where_clause(descriptor, &mut binder, None)?;
    let order_clause = conditions.order_clause(descriptor, &mut binder, None)?;
    let sql = format!(
        "select * from {}{}{}",
        descriptor.table_name(),
        where_clause,
        order_clause
    );
    Ok(binder.finish(sql))
}

/// `select count(*)`; ordering and pagination are ignored.
pub fn count(descriptor: &ResourceDescriptor, conditions: &Conditions) -> Result<Statement> {
    let mut binder = Binder::new();
    let where_clause = conditions.where_clause(descriptor, &mut binder, None)?;
    let sql = format!(
        "select count(*) from {}{}",
        descriptor.table_name(),
        where_clause
    );
    Ok(binder.finish(sql))
}

/// `select exists (...)`; ordering and pagination are ignored.
pub fn exists(descriptor: &ResourceDescriptor, conditions: &Conditions) -> Result<Statement> {
    let mut binder = Binder::new();
    let where_clause = conditions.where_clause(descriptor, &mut binder, None)?;
    let sql = format!(
        "select exists (select 1 from {}{})",
        descriptor.table_name(),
        where_clause
    );
    Ok(binder.finish(sql))
}

/// Selects the `owned` resources linked to `owner_id` through a
/// relationship table.
///
/// The relationship's owner column carries the owner id and its refer
/// column the owned id. `conditions` apply to the owned table.
pub fn owner_join_select(
    owned: &ResourceDescriptor,
    relationship: &ResourceDescriptor,
    owner_id: &str,
    conditions: &Conditions,
) -> Result<Statement> {
    let (Some(owner_column), Some(owned_column)) =
        (relationship.owners.first(), relationship.refers.first())
    else {
        return Err(DbError::InvalidResource {
            resource: relationship.type_name.clone(),
            reason: "not a relationship".to_string(),
        });
    };
    if !relationship.is_relationship || *owned_column != owned.type_name {
        return Err(DbError::InvalidResource {
            resource: relationship.type_name.clone(),
            reason: format!("does not relate '{}' to '{}'", owner_column, owned.type_name),
        });
    }

    let owned_table = owned.table_name();
    let rel_table = relationship.table_name();

    let mut binder = Binder::new();
    let owner_param = binder.bind(Value::Text(owner_id.to_string()));
    let mut where_clause = conditions.where_clause(owned, &mut binder, Some(&owned_table))?;
    let order_clause = conditions.order_clause(owned, &mut binder, Some(&owned_table))?;

    let owner_predicate = format!("{}.{} = {}", rel_table, quote(owner_column), owner_param);
    if where_clause.is_empty() {
        where_clause = format!(" where {}", owner_predicate);
    } else {
        where_clause = format!(" where {} and{}", owner_predicate, &where_clause[" where".len()..]);
    }

    let sql = format!(
        "select {owned_table}.* from {owned_table} inner join {rel_table} \
         on ({owned_table}.{id} = {rel_table}.{owned_column}){where_clause}{order_clause}",
        id = quote(ID_COLUMN),
        owned_column = quote(owned_column),
    );
    Ok(binder.finish(sql))
}

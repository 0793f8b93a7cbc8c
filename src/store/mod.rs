// ============================================================================
// Store / Transaction Runtime
// ============================================================================
//
// The transactional interface consumed by the layers above the engine. A
// transaction owns one live connection; `commit` and `rollback` consume it
// so a finished transaction cannot be reused.
//
// ============================================================================

pub mod replicated;
pub mod sql;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::{Result, Value};
use crate::meta::ResourceMeta;
use crate::schema::Resource;
use crate::statement::{Conditions, FieldValues};

pub use replicated::{ReplicatedStore, ReplicatedTransaction};
pub use sql::{SqlStore, SqlTransaction};

/// Typed CRUD and relationship queries inside one transaction.
///
/// Errors leave the transaction open; the caller decides whether to roll
/// back. Uniqueness and foreign-key violations surface as
/// `DbError::DuplicateResource` and `DbError::RelatedResourceMissing`.
#[async_trait]
pub trait Transaction: Send + Sized {
    /// Inserts `resource`, assigning an identifier and creation time when
    /// absent, and returns the stored version.
    async fn insert<R: Resource>(&mut self, resource: R) -> Result<R>;

    async fn get<R: Resource>(&mut self, conditions: &Conditions) -> Result<Vec<R>>;

    /// Like `get`, replacing the contents of `out`.
    async fn fill<R: Resource>(&mut self, conditions: &Conditions, out: &mut Vec<R>) -> Result<()> {
        *out = self.get::<R>(conditions).await?;
        Ok(())
    }

    /// Resources of type `R` linked to the owner `O` with id `owner_id`
    /// through their relationship table.
    async fn get_owned<O: Resource, R: Resource>(
        &mut self,
        owner_id: &str,
        conditions: &Conditions,
    ) -> Result<Vec<R>>;

    async fn fill_owned<O: Resource, R: Resource>(
        &mut self,
        owner_id: &str,
        conditions: &Conditions,
        out: &mut Vec<R>,
    ) -> Result<()> {
        *out = self.get_owned::<O, R>(owner_id, conditions).await?;
        Ok(())
    }

    async fn exists<R: Resource>(&mut self, conditions: &Conditions) -> Result<bool>;

    async fn count<R: Resource>(&mut self, conditions: &Conditions) -> Result<u64>;

    /// Runs a caller-supplied count statement once `R` is known to be registered.
    async fn count_ex<R: Resource>(&mut self, sql: &str, args: &[Value]) -> Result<u64>;

    /// Runs a caller-supplied select and maps its rows onto `R`.
    async fn get_ex<R: Resource>(&mut self, sql: &str, args: &[Value]) -> Result<Vec<R>>;

    async fn fill_ex<R: Resource>(&mut self, sql: &str, args: &[Value], out: &mut Vec<R>) -> Result<()> {
        *out = self.get_ex::<R>(sql, args).await?;
        Ok(())
    }

    async fn update<R: Resource>(&mut self, values: &FieldValues, conditions: &Conditions) -> Result<u64>;

    /// Empty conditions delete every row of `R`.
    async fn delete<R: Resource>(&mut self, conditions: &Conditions) -> Result<u64>;

    /// Executes an arbitrary statement and returns the affected rows.
    async fn exec(&mut self, sql: &str, args: &[Value]) -> Result<u64>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// A store whose tables are derived from one registry.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    type Tx: Transaction;

    fn meta(&self) -> &Arc<ResourceMeta>;

    /// Opens a transaction on a fresh connection.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Drops every registered table, dependents first.
    async fn clean(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

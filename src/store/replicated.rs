// ============================================================================
// Replicated Store
// ============================================================================
//
// Two stores behind one transactional interface. Writes run on the primary
// first and are replayed on the secondary only when the primary changed at
// least one row; reads are served by the primary alone. The two sides are
// not committed atomically: a failure between them leaves the stores
// diverged.
//
// ============================================================================

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

use super::{ResourceStore, Transaction};
use crate::core::{Result, Value};
use crate::meta::ResourceMeta;
use crate::schema::Resource;
use crate::statement::{Conditions, FieldValues};

pub struct ReplicatedStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P: ResourceStore, S: ResourceStore> ReplicatedStore<P, S> {
    /// Both stores are expected to be built from the same registry.
    pub fn new(primary: P, secondary: S) -> Self {
        if !Arc::ptr_eq(primary.meta(), secondary.meta()) {
            debug!("replicated store sides use distinct registries");
        }
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }
}

/// Applies the same finishing step to both sides. The primary's error wins
/// when both fail.
fn merge_outcomes(primary: Result<()>, secondary: Result<()>, step: &str) -> Result<()> {
    match (primary, secondary) {
        (Err(p), Err(s)) => {
            warn!("secondary {} failed as well: {}", step, s);
            Err(p)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

#[async_trait]
impl<P: ResourceStore, S: ResourceStore> ResourceStore for ReplicatedStore<P, S> {
    type Tx = ReplicatedTransaction<P::Tx, S::Tx>;

    fn meta(&self) -> &Arc<ResourceMeta> {
        self.primary.meta()
    }

    async fn begin(&self) -> Result<Self::Tx> {
        let primary = self.primary.begin().await?;
        let secondary = match self.secondary.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                if let Err(rollback) = primary.rollback().await {
                    warn!("rollback of primary after failed secondary begin: {}", rollback);
                }
                return Err(e);
            }
        };
        Ok(ReplicatedTransaction { primary, secondary })
    }

    async fn clean(&self) -> Result<()> {
        let primary = self.primary.clean().await;
        let secondary = self.secondary.clean().await;
        merge_outcomes(primary, secondary, "clean")
    }

    async fn close(&self) -> Result<()> {
        let primary = self.primary.close().await;
        let secondary = self.secondary.close().await;
        merge_outcomes(primary, secondary, "close")
    }
}

/// A pair of transactions finished together.
pub struct ReplicatedTransaction<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> ReplicatedTransaction<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

// A zero-row write on the primary is never replayed. This also skips
// statements that legitimately match nothing (an idempotent delete, say),
// which can leave the secondary behind if it had diverged.
fn replicate(operation: &str, affected: u64) -> bool {
    if affected == 0 {
        debug!("{} changed no rows on the primary; secondary skipped", operation);
        return false;
    }
    true
}

#[async_trait]
impl<P: Transaction, S: Transaction> Transaction for ReplicatedTransaction<P, S> {
    async fn insert<R: Resource>(&mut self, resource: R) -> Result<R> {
        let inserted = self.primary.insert(resource).await?;
        // the secondary keeps the identifier and time assigned on the primary
        self.secondary.insert(inserted.clone()).await?;
        Ok(inserted)
    }

    async fn get<R: Resource>(&mut self, conditions: &Conditions) -> Result<Vec<R>> {
        self.primary.get(conditions).await
    }

    async fn get_owned<O: Resource, R: Resource>(
        &mut self,
        owner_id: &str,
        conditions: &Conditions,
    ) -> Result<Vec<R>> {
        self.primary.get_owned::<O, R>(owner_id, conditions).await
    }

    async fn exists<R: Resource>(&mut self, conditions: &Conditions) -> Result<bool> {
        self.primary.exists::<R>(conditions).await
    }

    async fn count<R: Resource>(&mut self, conditions: &Conditions) -> Result<u64> {
        self.primary.count::<R>(conditions).await
    }

    async fn count_ex<R: Resource>(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        self.primary.count_ex::<R>(sql, args).await
    }

    async fn get_ex<R: Resource>(&mut self, sql: &str, args: &[Value]) -> Result<Vec<R>> {
        self.primary.get_ex(sql, args).await
    }

    async fn update<R: Resource>(&mut self, values: &FieldValues, conditions: &Conditions) -> Result<u64> {
        let affected = self.primary.update::<R>(values, conditions).await?;
        if replicate("update", affected) {
            self.secondary.update::<R>(values, conditions).await?;
        }
        Ok(affected)
    }

    async fn delete<R: Resource>(&mut self, conditions: &Conditions) -> Result<u64> {
        let affected = self.primary.delete::<R>(conditions).await?;
        if replicate("delete", affected) {
            self.secondary.delete::<R>(conditions).await?;
        }
        Ok(affected)
    }

    async fn exec(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        let affected = self.primary.exec(sql, args).await?;
        if replicate("exec", affected) {
            self.secondary.exec(sql, args).await?;
        }
        Ok(affected)
    }

    async fn commit(self) -> Result<()> {
        let primary = self.primary.commit().await;
        let secondary = self.secondary.commit().await;
        merge_outcomes(primary, secondary, "commit")
    }

    async fn rollback(self) -> Result<()> {
        let primary = self.primary.rollback().await;
        let secondary = self.secondary.rollback().await;
        merge_outcomes(primary, secondary, "rollback")
    }
}

// ============================================================================
// resmap Library
// ============================================================================
//
// Maps typed resources onto PostgreSQL tables: descriptors derived from
// declared resource types, a registry of those descriptors, generated
// parameterized SQL, a transactional store runtime and a replicated
// primary/secondary store.
//
// ============================================================================

pub mod connection;
pub mod core;
#[macro_use]
mod macros;
pub mod meta;
pub mod schema;
pub mod statement;
pub mod store;

// Re-export main types for convenience
pub use core::{DataType, DbError, IpNetwork, QueryResult, Result, Value};
pub use meta::ResourceMeta;
pub use schema::{FieldValue, Resource, ResourceBase, ResourceDescriptor};
pub use statement::{Conditions, FieldValues};

// Re-export the store API
pub use connection::{ConnectionConfig, DatabaseClient, DatabaseFactory, PgFactory};
pub use store::{
    ReplicatedStore, ReplicatedTransaction, ResourceStore, SqlStore, SqlTransaction, Transaction,
};

/// Builds a registry from resource types listed in dependency order.
///
/// # Examples
///
/// ```ignore
/// let meta = resmap::registry!(Zone, Record)?;
/// let store = SqlStore::open(config, Arc::new(meta)).await?;
/// ```
#[macro_export]
macro_rules! registry {
    ($($resource:ty),* $(,)?) => {{
        let mut meta = $crate::meta::ResourceMeta::new();
        let mut outcome: $crate::core::Result<()> = Ok(());
        $(
            if outcome.is_ok() {
                outcome = meta.register::<$resource>().map(|_| ());
            }
        )*
        outcome.map(|()| meta)
    }};
}

pub mod codec;
pub mod config;
pub mod pg;

use async_trait::async_trait;

use crate::core::{Result, QueryResult, Value};

pub use config::ConnectionConfig;
pub use pg::{PgClient, PgFactory};

/// One live connection to a relational store.
///
/// Statements use `$n` positional placeholders bound to `args` in order.
/// A backend reports uniqueness and foreign-key violations as
/// `DbError::UniqueViolation` / `DbError::ForeignKeyViolation` so callers can
/// attach resource context.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Execute a statement that is expected to return rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult>;

    /// Execute a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64>;

    /// Execute one or more statements without arguments (DDL, BEGIN/COMMIT).
    async fn batch_execute(&self, sql: &str) -> Result<()>;

    /// Close the connection. Every later call fails.
    async fn close(&self) -> Result<()>;
}

/// Opens fresh connections to one store.
#[async_trait]
pub trait DatabaseFactory: Send + Sync {
    type Client: DatabaseClient;

    async fn connect(&self) -> Result<Self::Client>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Closed,
}

use async_trait::async_trait;
use log::{debug, error};
use tokio::sync::Mutex;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use super::{ConnectionConfig, ConnectionState, DatabaseClient, DatabaseFactory};
use crate::core::{DbError, QueryResult, Result, Value};

/// Opens PostgreSQL connections from one configuration.
#[derive(Debug, Clone)]
pub struct PgFactory {
    config: ConnectionConfig,
}

impl PgFactory {
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Self::new(ConnectionConfig::from_url(url)?)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl DatabaseFactory for PgFactory {
    type Client = PgClient;

    async fn connect(&self) -> Result<PgClient> {
        let (client, connection) = self
            .config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", self.config.to_url(), e)))?;

        let target = self.config.to_url();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection to {} failed: {}", target, e);
            }
        });

        debug!("connected to {}", self.config.to_url());
        Ok(PgClient {
            client: Mutex::new(Some(client)),
        })
    }
}

/// A single PostgreSQL connection.
pub struct PgClient {
    client: Mutex<Option<Client>>,
}

impl PgClient {
    pub async fn state(&self) -> ConnectionState {
        match *self.client.lock().await {
            Some(_) => ConnectionState::Active,
            None => ConnectionState::Closed,
        }
    }
}

fn closed() -> DbError {
    DbError::ConnectionError("Connection is closed".to_string())
}

/// Maps constraint violations onto the backend-neutral error variants.
fn pg_error(err: tokio_postgres::Error) -> DbError {
    let detail = |err: &tokio_postgres::Error| {
        err.as_db_error()
            .map(|db| match db.detail() {
                Some(detail) => format!("{} ({})", db.message(), detail),
                None => db.message().to_string(),
            })
            .unwrap_or_else(|| err.to_string())
    };

    let code = err.code().cloned();
    if code == Some(SqlState::UNIQUE_VIOLATION) {
        DbError::UniqueViolation(detail(&err))
    } else if code == Some(SqlState::FOREIGN_KEY_VIOLATION) {
        DbError::ForeignKeyViolation(detail(&err))
    } else {
        DbError::Postgres(err)
    }
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl DatabaseClient for PgClient {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed)?;

        let statement = client.prepare(sql).await.map_err(pg_error)?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>();

        let rows = client
            .query(&statement, &params(args))
            .await
            .map_err(pg_error)?;

        let mut result = QueryResult::new(columns, Vec::with_capacity(rows.len()));
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for i in 0..row.len() {
                values.push(row.try_get::<_, Value>(i).map_err(pg_error)?);
            }
            result.rows.push(values);
        }
        Ok(result)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed)?;
        client.execute(sql, &params(args)).await.map_err(pg_error)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed)?;
        client.batch_execute(sql).await.map_err(pg_error)
    }

    async fn close(&self) -> Result<()> {
        // dropping the client ends the spawned connection task
        self.client.lock().await.take();
        Ok(())
    }
}

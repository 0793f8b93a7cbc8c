use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ResourceStore, Transaction};
use crate::connection::{ConnectionConfig, DatabaseClient, DatabaseFactory, PgFactory};
use crate::core::{DbError, QueryResult, Result, Value};
use crate::meta::ResourceMeta;
use crate::schema::{Resource, RowReader};
use crate::statement::{self, Conditions, FieldValues, Statement};

/// Store backed by one relational database.
///
/// Every transaction gets its own connection from the factory; a separate
/// administrative connection runs the DDL.
pub struct SqlStore<F: DatabaseFactory> {
    factory: F,
    meta: Arc<ResourceMeta>,
    admin: F::Client,
    closed: AtomicBool,
}

impl SqlStore<PgFactory> {
    /// Connects to PostgreSQL and creates the registered tables.
    pub async fn open(config: ConnectionConfig, meta: Arc<ResourceMeta>) -> Result<Self> {
        Self::with_factory(PgFactory::new(config)?, meta).await
    }
}

impl<F: DatabaseFactory> SqlStore<F> {
    /// Creates every registered table that does not exist yet, in
    /// registration order.
    pub async fn with_factory(factory: F, meta: Arc<ResourceMeta>) -> Result<Self> {
        let admin = factory.connect().await?;
        for descriptor in meta.descriptors() {
            let stmt = statement::create_table(descriptor);
            debug!("{}", stmt);
            admin.batch_execute(&stmt.sql).await?;
            info!("table {} ready", descriptor.table_name());
        }

        Ok(Self {
            factory,
            meta,
            admin,
            closed: AtomicBool::new(false),
        })
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DbError::StoreClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl<F: DatabaseFactory> ResourceStore for SqlStore<F> {
    type Tx = SqlTransaction<F::Client>;

    fn meta(&self) -> &Arc<ResourceMeta> {
        &self.meta
    }

    async fn begin(&self) -> Result<Self::Tx> {
        self.ensure_open()?;
        let client = self.factory.connect().await?;
        client.batch_execute("begin").await?;
        Ok(SqlTransaction {
            client,
            meta: Arc::clone(&self.meta),
        })
    }

    async fn clean(&self) -> Result<()> {
        self.ensure_open()?;
        for descriptor in self.meta.descriptors().rev() {
            let stmt = statement::drop_table(descriptor);
            debug!("{}", stmt);
            self.admin.batch_execute(&stmt.sql).await?;
        }
        info!("dropped {} tables", self.meta.len());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.admin.close().await
    }
}

/// A transaction on one connection of a [`SqlStore`].
pub struct SqlTransaction<C: DatabaseClient> {
    client: C,
    meta: Arc<ResourceMeta>,
}

impl<C: DatabaseClient> SqlTransaction<C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    async fn query(&self, stmt: &Statement) -> Result<QueryResult> {
        debug!("{}", stmt);
        self.client.query(&stmt.sql, &stmt.args).await
    }

    async fn execute(&self, stmt: &Statement, resource: &str) -> Result<u64> {
        debug!("{}", stmt);
        self.client
            .execute(&stmt.sql, &stmt.args)
            .await
            .map_err(|e| e.classify(resource))
    }

    /// Ends the transaction with `sql` and releases the connection either way.
    async fn finish(self, sql: &str) -> Result<()> {
        let outcome = self.client.batch_execute(sql).await;
        let closed = self.client.close().await;
        outcome.and(closed)
    }
}

fn into_resources<R: Resource>(result: QueryResult) -> Result<Vec<R>> {
    result
        .into_records()
        .map(|record| R::from_row(&mut RowReader::new(R::type_name(), record)))
        .collect()
}

fn scalar_count(result: &QueryResult) -> Result<u64> {
    match result.scalar() {
        Some(Value::Integer(n)) => u64::try_from(*n)
            .map_err(|_| DbError::TypeMismatch(format!("negative count {}", n))),
        Some(Value::Unsigned(n)) => Ok(*n),
        other => Err(DbError::TypeMismatch(format!(
            "expected a count, got {:?}",
            other
        ))),
    }
}

#[async_trait]
impl<C: DatabaseClient> Transaction for SqlTransaction<C> {
    async fn insert<R: Resource>(&mut self, mut resource: R) -> Result<R> {
        let stmt = statement::insert(self.meta.descriptor_of::<R>()?, &mut resource)?;
        self.execute(&stmt, R::type_name()).await?;
        Ok(resource)
    }

    async fn get<R: Resource>(&mut self, conditions: &Conditions) -> Result<Vec<R>> {
        let stmt = statement::select(self.meta.descriptor_of::<R>()?, conditions)?;
        into_resources(self.query(&stmt).await?)
    }

    async fn get_owned<O: Resource, R: Resource>(
        &mut self,
        owner_id: &str,
        conditions: &Conditions,
    ) -> Result<Vec<R>> {
        self.meta.check_runtime_type::<O>()?;
        let owned = self.meta.descriptor_of::<R>()?;
        let relationship = self.meta.relationship(O::type_name(), R::type_name())?;
        let stmt = statement::owner_join_select(owned, relationship, owner_id, conditions)?;
        into_resources(self.query(&stmt).await?)
    }

    async fn exists<R: Resource>(&mut self, conditions: &Conditions) -> Result<bool> {
        let stmt = statement::exists(self.meta.descriptor_of::<R>()?, conditions)?;
        let result = self.query(&stmt).await?;
        match result.scalar() {
            Some(Value::Boolean(b)) => Ok(*b),
            other => Err(DbError::TypeMismatch(format!(
                "expected a boolean, got {:?}",
                other
            ))),
        }
    }

    async fn count<R: Resource>(&mut self, conditions: &Conditions) -> Result<u64> {
        let stmt = statement::count(self.meta.descriptor_of::<R>()?, conditions)?;
        scalar_count(&self.query(&stmt).await?)
    }

    async fn count_ex<R: Resource>(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        self.meta.check_runtime_type::<R>()?;
        let stmt = Statement::new(sql, args.to_vec());
        scalar_count(&self.query(&stmt).await?)
    }

    async fn get_ex<R: Resource>(&mut self, sql: &str, args: &[Value]) -> Result<Vec<R>> {
        self.meta.check_runtime_type::<R>()?;
        let stmt = Statement::new(sql, args.to_vec());
        into_resources(self.query(&stmt).await?)
    }

    async fn update<R: Resource>(&mut self, values: &FieldValues, conditions: &Conditions) -> Result<u64> {
        let stmt = statement::update(self.meta.descriptor_of::<R>()?, values, conditions)?;
        self.execute(&stmt, R::type_name()).await
    }

    async fn delete<R: Resource>(&mut self, conditions: &Conditions) -> Result<u64> {
        let stmt = statement::delete(self.meta.descriptor_of::<R>()?, conditions)?;
        self.execute(&stmt, R::type_name()).await
    }

    async fn exec(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        debug!("{}", Statement::new(sql, args.to_vec()));
        self.client.execute(sql, args).await
    }

    async fn commit(self) -> Result<()> {
        self.finish("commit").await
    }

    async fn rollback(self) -> Result<()> {
        self.finish("rollback").await
    }
}

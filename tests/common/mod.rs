#![allow(dead_code)]

// In-process backend for store tests: records every statement and answers
// from a queue of canned replies.

use async_trait::async_trait;
use resmap::connection::{DatabaseClient, DatabaseFactory};
use resmap::{DbError, QueryResult, Result, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub enum Reply {
    Rows(QueryResult),
    Affected(u64),
    Fail(DbError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
struct State {
    name: String,
    recorded: Vec<Recorded>,
    replies: VecDeque<Reply>,
    fail_connect: bool,
    fail_batch: Option<String>,
    connects: usize,
}

/// Shared script and log of one fake database.
#[derive(Clone, Default)]
pub struct Backend {
    state: Arc<Mutex<State>>,
}

impl Backend {
    pub fn new() -> Self {
        Self::named("db")
    }

    /// The name tags this backend's scripted failures.
    pub fn named(name: &str) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().name = name.to_string();
        backend
    }

    pub fn factory(&self) -> ScriptedFactory {
        ScriptedFactory {
            backend: self.clone(),
        }
    }

    pub fn reply(&self, reply: Reply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    pub fn rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.reply(Reply::Rows(QueryResult::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows,
        )));
    }

    pub fn scalar(&self, value: Value) {
        self.rows(&["?column?"], vec![vec![value]]);
    }

    pub fn affected(&self, n: u64) {
        self.reply(Reply::Affected(n));
    }

    pub fn fail(&self, err: DbError) {
        self.reply(Reply::Fail(err));
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    /// Fails every batch statement starting with `prefix` (e.g. "commit").
    pub fn fail_batch(&self, prefix: &str) {
        self.state.lock().unwrap().fail_batch = Some(prefix.to_string());
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.recorded().into_iter().map(|r| r.sql).collect()
    }

    /// Statements other than transaction control and DDL.
    pub fn dml(&self) -> Vec<Recorded> {
        self.recorded()
            .into_iter()
            .filter(|r| {
                !matches!(r.sql.as_str(), "begin" | "commit" | "rollback")
                    && !r.sql.starts_with("create table")
                    && !r.sql.starts_with("drop table")
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().recorded.clear();
    }

    fn record(&self, sql: &str, args: &[Value]) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.recorded.push(Recorded {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        state.replies.pop_front()
    }
}

pub struct ScriptedFactory {
    backend: Backend,
}

#[async_trait]
impl DatabaseFactory for ScriptedFactory {
    type Client = ScriptedClient;

    async fn connect(&self) -> Result<ScriptedClient> {
        let mut state = self.backend.state.lock().unwrap();
        if state.fail_connect {
            return Err(DbError::ConnectionError("refused".to_string()));
        }
        state.connects += 1;
        Ok(ScriptedClient {
            backend: self.backend.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

pub struct ScriptedClient {
    backend: Backend,
    closed: AtomicBool,
}

impl ScriptedClient {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionError("Connection is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for ScriptedClient {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        match self.backend.record(sql, args) {
            Some(Reply::Rows(result)) => Ok(result),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Affected(_)) | None => Ok(QueryResult::empty()),
        }
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
        self.ensure_open()?;
        match self.backend.record(sql, args) {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Rows(result)) => Ok(result.row_count() as u64),
            None => Ok(1),
        }
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.backend.state.lock().unwrap();
        state.recorded.push(Recorded {
            sql: sql.to_string(),
            args: Vec::new(),
        });
        match &state.fail_batch {
            Some(prefix) if sql.starts_with(prefix.as_str()) => {
                Err(DbError::ExecutionError(format!("{} refused by {}", sql, state.name)))
            }
            _ => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

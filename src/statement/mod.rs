// ============================================================================
// Statement Builder
// ============================================================================
//
// Pure functions turning a descriptor plus conditions into parameterized SQL
// ($n placeholders) and its argument list. Nothing here touches a
// connection: every failure is reported before any I/O happens.
//
// ============================================================================

pub mod condition;
pub mod ddl;
pub mod delete;
pub mod dml;
pub mod query;
pub mod types;
pub mod update;

use std::collections::BTreeMap;
use std::fmt;

use crate::core::{DbError, Result, Value};
use crate::schema::ResourceDescriptor;

pub use condition::{Condition, Conditions};
pub use ddl::{create_table, drop_table};
pub use delete::delete;
pub use dml::insert;
pub use query::{count, exists, owner_join_select, select};
pub use types::column_type;
pub use update::update;

/// New column values of an update, keyed by column name.
pub type FieldValues = BTreeMap<String, Value>;

/// SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, " [{}]", args.join(", "))?;
        }
        Ok(())
    }
}

/// Allocates `$n` placeholders in argument order.
#[derive(Debug, Default)]
pub(crate) struct Binder {
    args: Vec<Value>,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&mut self, value: Value) -> String {
        self.args.push(value);
        format!("${}", self.args.len())
    }

    pub(crate) fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            args: self.args,
        }
    }
}

/// Quotes a column identifier; names such as `user` or `order` are reserved.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

pub(crate) fn check_column(descriptor: &ResourceDescriptor, column: &str) -> Result<()> {
    if descriptor.has_column(column) {
        Ok(())
    } else {
        Err(DbError::UnknownColumn {
            resource: descriptor.type_name.clone(),
            column: column.to_string(),
        })
    }
}

use std::collections::BTreeMap;

use super::{Binder, check_column, quote};
use crate::core::{DataType, DbError, Result, Value};
use crate::schema::{ID_COLUMN, ResourceDescriptor};

/// Reserved keys of the loose condition-map protocol.
pub const ORDER_BY_KEY: &str = "orderby";
pub const LIMIT_KEY: &str = "limit";
pub const OFFSET_KEY: &str = "offset";
pub const SEARCH_KEY: &str = "search";
pub const MATCH_LIST_KEY: &str = "match_list";

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Equal { column: String, value: Value },
    /// `column like '%pattern%'`, case-sensitive substring match.
    Search { column: String, pattern: String },
    /// `(column = v1 or column = v2 ...)`
    MatchList { column: String, values: Vec<Value> },
    OrderBy(String),
    Page { limit: u64, offset: u64 },
}

/// An ordered set of conditions for select/count/exists/update/delete.
///
/// An empty set means "no filter": the statement carries no WHERE clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    items: Vec<Condition>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.items.push(Condition::Equal {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// Shorthand for `eq("id", id)`.
    pub fn id(self, id: &str) -> Self {
        self.eq(ID_COLUMN, id)
    }

    pub fn search(mut self, column: &str, pattern: &str) -> Self {
        self.items.push(Condition::Search {
            column: column.to_string(),
            pattern: pattern.to_string(),
        });
        self
    }

    pub fn match_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.items.push(Condition::MatchList {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.items.push(Condition::OrderBy(column.to_string()));
        self
    }

    pub fn page(mut self, limit: u64, offset: u64) -> Self {
        self.items.push(Condition::Page { limit, offset });
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.items.push(condition);
    }

    pub fn items(&self) -> &[Condition] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parses the loose condition-map protocol.
    ///
    /// `orderby`, `limit`/`offset`, `search` and `match_list` are consumed
    /// first; `search`/`match_list` name comma-separated columns whose own
    /// entries carry the pattern (resp. comma-separated accepted values).
    /// Every remaining key becomes an equality.
    pub fn from_map(map: BTreeMap<String, Value>) -> Result<Self> {
        let mut map = map;
        let mut conditions = Self::new();

        let order_by = match map.remove(ORDER_BY_KEY) {
            None => None,
            Some(value) => Some(require_text(ORDER_BY_KEY, value)?),
        };

        let page = match (map.remove(LIMIT_KEY), map.remove(OFFSET_KEY)) {
            (None, None) => None,
            (Some(limit), Some(offset)) => Some((
                parse_page_value(LIMIT_KEY, &limit)?,
                parse_page_value(OFFSET_KEY, &offset)?,
            )),
            _ => {
                return Err(DbError::InvalidPagination(
                    "limit and offset must be given together".to_string(),
                ));
            }
        };

        let search = match map.remove(SEARCH_KEY) {
            None => Vec::new(),
            Some(value) => split_list(&require_text(SEARCH_KEY, value)?),
        };
        let match_list = match map.remove(MATCH_LIST_KEY) {
            None => Vec::new(),
            Some(value) => split_list(&require_text(MATCH_LIST_KEY, value)?),
        };

        let mut searches = Vec::new();
        for column in search {
            let value = take_named(&mut map, SEARCH_KEY, &column)?;
            let pattern = require_text(&column, value)?;
            searches.push(Condition::Search { column, pattern });
        }

        let mut match_lists = Vec::new();
        for column in match_list {
            let value = take_named(&mut map, MATCH_LIST_KEY, &column)?;
            let values = split_list(&require_text(&column, value)?)
                .into_iter()
                .map(Value::Text)
                .collect();
            match_lists.push(Condition::MatchList { column, values });
        }

        for (column, value) in map {
            conditions.items.push(Condition::Equal { column, value });
        }
        conditions.items.extend(searches);
        conditions.items.extend(match_lists);
        if let Some(column) = order_by {
            conditions.items.push(Condition::OrderBy(column));
        }
        if let Some((limit, offset)) = page {
            conditions.items.push(Condition::Page { limit, offset });
        }

        Ok(conditions)
    }

    // ------------------------------------------------------------------
    // SQL translation
    // ------------------------------------------------------------------

    /// ` where a = $1 and ...`, or an empty string when there is no predicate.
    pub(crate) fn where_clause(
        &self,
        descriptor: &ResourceDescriptor,
        binder: &mut Binder,
        qualifier: Option<&str>,
    ) -> Result<String> {
        let column_ref = |column: &str| match qualifier {
            Some(table) => format!("{}.{}", table, quote(column)),
            None => quote(column),
        };

        let mut predicates = Vec::new();
        for condition in &self.items {
            match condition {
                Condition::Equal { column, value } => {
                    check_column(descriptor, column)?;
                    let placeholder = binder.bind(value.clone());
                    predicates.push(format!("{} = {}", column_ref(column), placeholder));
                }
                Condition::Search { column, pattern } => {
                    check_column(descriptor, column)?;
                    if descriptor.column_datatype(column) != Some(DataType::String) {
                        return Err(DbError::InvalidCondition(format!(
                            "search on non-text column '{}'",
                            column
                        )));
                    }
                    let pattern = format!("%{}%", escape_like(pattern));
                    let placeholder = binder.bind(Value::Text(pattern));
                    predicates.push(format!("{} like {}", column_ref(column), placeholder));
                }
                Condition::MatchList { column, values } => {
                    check_column(descriptor, column)?;
                    if values.is_empty() {
                        return Err(DbError::InvalidCondition(format!(
                            "match list for '{}' is empty",
                            column
                        )));
                    }
                    let alternatives: Vec<String> = values
                        .iter()
                        .map(|value| {
                            format!("{} = {}", column_ref(column), binder.bind(value.clone()))
                        })
                        .collect();
                    predicates.push(format!("({})", alternatives.join(" or ")));
                }
                Condition::OrderBy(_) | Condition::Page { .. } => {}
            }
        }

        if predicates.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" where {}", predicates.join(" and ")))
        }
    }

    /// ` order by ... [limit $n offset $m]` for selects; rows sort by id
    /// unless an explicit order is given.
    pub(crate) fn order_clause(
        &self,
        descriptor: &ResourceDescriptor,
        binder: &mut Binder,
        qualifier: Option<&str>,
    ) -> Result<String> {
        let column_ref = |column: &str| match qualifier {
            Some(table) => format!("{}.{}", table, quote(column)),
            None => quote(column),
        };

        let mut order_by = None;
        let mut page = None;
        for condition in &self.items {
            match condition {
                Condition::OrderBy(column) => {
                    check_column(descriptor, column)?;
                    order_by = Some(column.as_str());
                }
                Condition::Page { limit, offset } => page = Some((*limit, *offset)),
                _ => {}
            }
        }

        let mut clause = format!(" order by {}", column_ref(order_by.unwrap_or(ID_COLUMN)));
        if let Some((limit, offset)) = page {
            let limit = binder.bind(page_arg(limit)?);
            let offset = binder.bind(page_arg(offset)?);
            clause.push_str(&format!(" limit {} offset {}", limit, offset));
        }
        Ok(clause)
    }

    /// Rejects ordering/pagination where only predicates make sense.
    pub(crate) fn ensure_predicates_only(&self, operation: &str) -> Result<()> {
        if self
            .items
            .iter()
            .any(|c| matches!(c, Condition::OrderBy(_) | Condition::Page { .. }))
        {
            return Err(DbError::InvalidCondition(format!(
                "{} does not accept ordering or pagination",
                operation
            )));
        }
        Ok(())
    }
}

fn require_text(key: &str, value: Value) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(DbError::InvalidCondition(format!(
            "value of '{}' must be a string, got {}",
            key,
            other.type_name()
        ))),
    }
}

fn take_named(map: &mut BTreeMap<String, Value>, key: &str, column: &str) -> Result<Value> {
    map.remove(column).ok_or_else(|| {
        DbError::InvalidCondition(format!("'{}' names '{}' but no value is given", key, column))
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

fn parse_page_value(key: &str, value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Integer(i) => u64::try_from(*i).ok(),
        Value::Unsigned(u) => Some(*u),
        Value::Text(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DbError::InvalidPagination(format!("'{}' must be a non-negative integer, got {}", key, value))
    })
}

fn page_arg(n: u64) -> Result<Value> {
    i64::try_from(n)
        .map(Value::Integer)
        .map_err(|_| DbError::InvalidPagination(format!("{} is out of range", n)))
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

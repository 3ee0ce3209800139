//! Read-side query descriptions.
//!
//! A [`SelectQuery`] is a plain value: stores translate it into their own
//! dialect (PostgREST query strings, in-memory filtering).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Record;

/// A single row predicate. All filters on a query are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// Exact match on a column.
    Eq { field: String, value: Value },
    /// Case-insensitive substring match (`ILIKE '%term%'`).
    ILike { field: String, term: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ilike(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self::ILike {
            field: field.into(),
            term: term.into(),
        }
    }

    /// Column this filter applies to.
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. } | Self::ILike { field, .. } => field,
        }
    }

    /// Evaluates the predicate against a record.
    ///
    /// `id` is addressable like any other column. Non-string columns are
    /// compared on their JSON rendering for `ILike`.
    pub fn matches(&self, record: &Record) -> bool {
        let column = match self.field() {
            "id" => Some(Value::String(record.id.clone())),
            name => record.fields.get(name).cloned(),
        };
        match (self, column) {
            (Self::Eq { value, .. }, Some(column)) => &column == value,
            (Self::ILike { term, .. }, Some(Value::String(s))) => {
                s.to_lowercase().contains(&term.to_lowercase())
            }
            (Self::ILike { .. }, Some(Value::Null)) => false,
            (Self::ILike { term, .. }, Some(other)) => {
                other.to_string().to_lowercase().contains(&term.to_lowercase())
            }
            (_, None) => false,
        }
    }
}

/// Single-column ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// A read against one table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub table: String,
    /// Column list / embedded-resource select statement. `*` by default.
    pub select: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    /// Ask the store for the total matching row count.
    pub count: bool,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            count: false,
        }
    }

    /// Shorthand for `select * from table where id = ?`.
    pub fn by_id(table: impl Into<String>, id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new(table).filter(Filter::eq("id", id)).limit(1)
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = select.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// True if every filter accepts the record.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }
}

/// Rows returned by a select, delivered as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub records: Vec<Record>,
    /// Total matching rows before `limit`, when requested.
    pub count: Option<usize>,
}

impl QueryResult {
    pub fn new(records: Vec<Record>, count: Option<usize>) -> Self {
        Self { records, count }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_first(self) -> Option<Record> {
        self.records.into_iter().next()
    }
}

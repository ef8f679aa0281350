//! Per-call option structs for select, update, delete and create.

use std::fmt;
use std::str::FromStr;

use crate::error::DbError;
use crate::filter::Filter;
use crate::records::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc  => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DbError::Validation(format!(
                "sort direction must be 'asc' or 'desc', got '{other}'"
            ))),
        }
    }
}

/// One ORDER BY entry. `column` may name a table column or an aggregate
/// result label such as `price_sum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Asc }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunc {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum   => "sum",
            AggregateFunc::Min   => "min",
            AggregateFunc::Max   => "max",
            AggregateFunc::Avg   => "avg",
        }
    }
}

impl FromStr for AggregateFunc {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFunc::Count),
            "sum" => Ok(AggregateFunc::Sum),
            "min" => Ok(AggregateFunc::Min),
            "max" => Ok(AggregateFunc::Max),
            "avg" => Ok(AggregateFunc::Avg),
            other => Err(DbError::Validation(format!("unknown aggregate function '{other}'"))),
        }
    }
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub column: String,
    pub func: AggregateFunc,
}

impl Aggregate {
    pub fn new(column: impl Into<String>, func: AggregateFunc) -> Self {
        Self { column: column.into(), func }
    }

    /// Result column name, `<column>_<func>`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.column, self.func)
    }
}

/// Options for [`Database::select`](crate::Database::select).
///
/// The default selects every column of every row in engine order.
///
/// | field | default | meaning |
/// |---|---|---|
/// | `columns` | `None` | all columns (or group keys + aggregates when grouping) |
/// | `filter` | `None` | no WHERE clause |
/// | `group_by` | empty | no explicit grouping |
/// | `aggregates` | empty | no aggregate columns |
/// | `order_by` | empty | engine order |
/// | `limit` | `None` | unbounded; `Some(0)` returns no rows without querying |
/// | `offset` | `None` | start at the first row |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub columns: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn aggregate(mut self, column: impl Into<String>, func: AggregateFunc) -> Self {
        self.aggregates.push(Aggregate::new(column, func));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy { column: column.into(), direction });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// True when the query groups rows, explicitly or through aggregates.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty() || !self.aggregates.is_empty()
    }
}

/// Options for [`Database::update`](crate::Database::update).
///
/// A filter is required unless `all_rows` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOptions {
    pub filter: Option<Filter>,
    pub values: Row,
    pub all_rows: bool,
}

impl UpdateOptions {
    pub fn new(values: Row) -> Self {
        Self { filter: None, values, all_rows: false }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn all_rows(mut self) -> Self {
        self.all_rows = true;
        self
    }
}

/// Options for [`Database::delete`](crate::Database::delete).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub filter: Option<Filter>,
    pub all_rows: bool,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn all_rows(mut self) -> Self {
        self.all_rows = true;
        self
    }
}

/// Options for table creation. `replace` drops an existing table of the same
/// name first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub replace: bool,
}

impl CreateOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

//! Declarative row filters.
//!
//! A [`Filter`] is a tree of comparisons combined with AND / OR / NOT. It is
//! compiled to SQL by the statement builder and evaluated by the engine.

use std::fmt;
use std::str::FromStr;

use crate::error::DbError;
use crate::value::Value;

/// Comparison operators, parsed case-insensitively from their textual names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    ILike,
    NotILike,
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq         => "=",
            Operator::NotEq      => "!=",
            Operator::Gt         => ">",
            Operator::Gte        => ">=",
            Operator::Lt         => "<",
            Operator::Lte        => "<=",
            Operator::Like       => "LIKE",
            Operator::NotLike    => "NOTLIKE",
            Operator::ILike      => "ILIKE",
            Operator::NotILike   => "NOTILIKE",
            Operator::Contains   => "CONTAINS",
            Operator::StartsWith => "STARTSWITH",
            Operator::EndsWith   => "ENDSWITH",
        }
    }

    /// Operators that match text patterns and need a text column.
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Operator::Like
                | Operator::NotLike
                | Operator::ILike
                | Operator::NotILike
                | Operator::Contains
                | Operator::StartsWith
                | Operator::EndsWith
        )
    }
}

impl FromStr for Operator {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "LIKE" => Operator::Like,
            "NOTLIKE" => Operator::NotLike,
            "ILIKE" => Operator::ILike,
            "NOTILIKE" => Operator::NotILike,
            "CONTAINS" => Operator::Contains,
            "STARTSWITH" => Operator::StartsWith,
            "ENDSWITH" => Operator::EndsWith,
            _ => return Err(DbError::Validation(format!("unknown operator '{s}'"))),
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a list of filters is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boolean {
    #[default]
    And,
    Or,
}

impl FromStr for Boolean {
    type Err = std::convert::Infallible;

    /// `"or"` (any case) selects OR; everything else is AND.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.trim().eq_ignore_ascii_case("or") {
            Boolean::Or
        } else {
            Boolean::And
        })
    }
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    /// Column value is one of `values`. An empty list matches no row.
    In { column: String, values: Vec<Value> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Filter::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Build a comparison from a textual operator, e.g. `("age", ">=", 18)`.
    pub fn parse(column: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self, DbError> {
        Ok(Self::compare(column, op.parse()?, value))
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::NotEq, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Lte, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::Like, pattern.into())
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::NotLike, pattern.into())
    }

    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::ILike, pattern.into())
    }

    pub fn not_ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::NotILike, pattern.into())
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::compare(column, Operator::Contains, needle.into())
    }

    pub fn starts_with(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::compare(column, Operator::StartsWith, prefix.into())
    }

    pub fn ends_with(column: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::compare(column, Operator::EndsWith, suffix.into())
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Join a flat list of filters with AND or OR.
    pub fn combine(filters: impl IntoIterator<Item = Filter>, boolean: Boolean) -> Self {
        match boolean {
            Boolean::And => Self::and(filters),
            Boolean::Or => Self::or(filters),
        }
    }

    /// True when the filter places no constraint on rows: an empty group, or
    /// a group/negation made only of empty groups.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Compare { .. } | Filter::In { .. } => false,
            Filter::And(children) | Filter::Or(children) => children.iter().all(Filter::is_empty),
            Filter::Not(inner) => inner.is_empty(),
        }
    }

    /// Every column name referenced by the tree, in traversal order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Compare { column, .. } | Filter::In { column, .. } => out.push(column),
            Filter::And(children) | Filter::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Filter::Not(inner) => inner.collect_columns(out),
        }
    }
}

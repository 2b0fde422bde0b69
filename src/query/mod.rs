//! Query model handed to storage engines.
//!
//! A [`Query`] is a conjunction of [`Condition`]s plus ordering and
//! pagination. There is no OR: every condition added narrows the result.

pub mod pattern;
pub mod scope;

pub use scope::{BoxedScope, Scope, apply_scopes, compose_scopes};

use crate::core::{Result, Row, compare, values_equal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-sensitive LIKE.
    Like,
    /// Case-insensitive LIKE.
    ILike,
    /// Value must be an array; matches when any element is equal.
    In,
    IsNull,
    NotNull,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::IsNull => "is_null",
            Operator::NotNull => "not_null",
        }
    }
}

/// One predicate over a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lte, value)
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, Operator::Like, pattern.into())
    }

    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, Operator::ILike, pattern.into())
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, Operator::In, Value::Array(values))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, Value::Null)
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::NotNull, Value::Null)
    }

    /// Evaluates the predicate against a row. A missing column reads as NULL.
    ///
    /// Ordering operators never match NULL on either side; comparing
    /// incompatible types is an error.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        let actual = row.get(&self.field).unwrap_or(&Value::Null);

        let matched = match self.operator {
            Operator::Eq if self.value.is_null() => actual.is_null(),
            Operator::Eq => values_equal(actual, &self.value),
            Operator::Ne => {
                !actual.is_null() && !self.value.is_null() && !values_equal(actual, &self.value)
            }
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                if actual.is_null() || self.value.is_null() {
                    return Ok(false);
                }
                let ordering = compare(actual, &self.value)?;
                match self.operator {
                    Operator::Gt => ordering == Ordering::Greater,
                    Operator::Gte => ordering != Ordering::Less,
                    Operator::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
            Operator::Like | Operator::ILike => match (actual.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => {
                    pattern::eval_like(text, pattern, self.operator == Operator::Like)?
                }
                _ => false,
            },
            Operator::In => self
                .value
                .as_array()
                .is_some_and(|candidates| candidates.iter().any(|c| values_equal(actual, c))),
            Operator::IsNull => actual.is_null(),
            Operator::NotNull => !actual.is_null(),
        };

        Ok(matched)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A single-table read/write target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
    pub offset: usize,
    /// `None` is unbounded.
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for the row whose primary key equals `id`.
    pub fn by_key(primary_key: &str, id: &str) -> Self {
        Self::new().filter(Condition::eq(primary_key, key_value(id)))
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Condition::eq(field, value))
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when every condition holds for `row`.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.matches(row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Column names referenced by conditions and ordering.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .map(|c| c.field.as_str())
            .chain(self.order_by.iter().map(|o| o.field.as_str()))
    }
}

/// Interprets a textual identifier: integers become JSON numbers, anything else stays text.
pub fn key_value(id: &str) -> Value {
    id.trim()
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}

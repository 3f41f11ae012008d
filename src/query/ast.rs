//! Query Abstract Syntax Tree
//!
//! Mirrors the platform's `DynamicSQLQuery` JSON so a [`Query`] can be sent
//! over DataSync as-is.
//!
//! # Example
//!
//! ```rust
//! use thinpost::query::query;
//!
//! let posts = query("posts").order_by("createdAt").build();
//! assert_eq!(posts.order_by_clause[0].order_by_column, "created_at");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A query over one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Table to read from
    pub table: String,
    /// Columns to return
    pub selected_columns: SelectedColumns,
    /// Optional row filter
    pub where_condition: Option<ConditionExpression>,
    /// Sort order, first clause wins
    pub order_by_clause: Vec<OrderByClause>,
    /// Optional `DISTINCT ON` column
    pub distinct_on_column: Option<String>,
    /// Optional limit on results
    pub limit: Option<u64>,
    /// Optional offset into results
    pub offset: Option<u64>,
}

/// Start building a query over a table
pub fn query(table: &str) -> QueryBuilder {
    QueryBuilder::new(table)
}

/// Column selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "contents")]
pub enum SelectedColumns {
    SelectAll,
    SelectSpecific(Vec<String>),
}

/// One ORDER BY clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByClause {
    pub order_by_column: String,
    pub order_by_direction: OrderByDirection,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// Condition tree for WHERE clauses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum ConditionExpression {
    ColumnExpression {
        field: String,
    },
    InfixOperatorExpression {
        left: Box<ConditionExpression>,
        op: ConditionOperator,
        right: Box<ConditionExpression>,
    },
    LiteralExpression {
        value: DynamicValue,
    },
}

impl ConditionExpression {
    /// `field = value`
    pub fn equals(field: &str, value: DynamicValue) -> Self {
        Self::infix(
            Self::ColumnExpression {
                field: to_snake_case(field),
            },
            ConditionOperator::OpEqual,
            Self::LiteralExpression { value },
        )
    }

    /// `self AND other`
    pub fn and(self, other: ConditionExpression) -> Self {
        Self::infix(self, ConditionOperator::OpAnd, other)
    }

    fn infix(left: Self, op: ConditionOperator, right: Self) -> Self {
        Self::InfixOperatorExpression {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

/// Operators understood by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    OpEqual,
    OpNotEqual,
    OpGreaterThan,
    OpGreaterThanOrEqual,
    OpLessThan,
    OpLessThanOrEqual,
    OpAnd,
    OpOr,
}

/// A literal value in a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "contents")]
pub enum DynamicValue {
    IntValue(i64),
    DoubleValue(f64),
    TextValue(String),
    BoolValue(bool),
    #[serde(rename = "UUIDValue")]
    UuidValue(Uuid),
    DateTimeValue(DateTime<Utc>),
    Null,
}

impl DynamicValue {
    /// JSON form of the value, as it appears in records
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DynamicValue::IntValue(v) => Value::from(*v),
            DynamicValue::DoubleValue(v) => Value::from(*v),
            DynamicValue::TextValue(v) => Value::from(v.as_str()),
            DynamicValue::BoolValue(v) => Value::from(*v),
            DynamicValue::UuidValue(v) => Value::from(v.to_string()),
            DynamicValue::DateTimeValue(v) => Value::from(v.to_rfc3339()),
            DynamicValue::Null => Value::Null,
        }
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        DynamicValue::IntValue(v)
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        DynamicValue::DoubleValue(v)
    }
}

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        DynamicValue::BoolValue(v)
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        DynamicValue::TextValue(v.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        DynamicValue::TextValue(v)
    }
}

impl From<Uuid> for DynamicValue {
    fn from(v: Uuid) -> Self {
        DynamicValue::UuidValue(v)
    }
}

impl From<DateTime<Utc>> for DynamicValue {
    fn from(v: DateTime<Utc>) -> Self {
        DynamicValue::DateTimeValue(v)
    }
}

/// Builder for constructing queries
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Create a new builder selecting every column of `table`
    pub fn new(table: &str) -> Self {
        Self {
            query: Query {
                table: table.to_string(),
                selected_columns: SelectedColumns::SelectAll,
                where_condition: None,
                order_by_clause: Vec::new(),
                distinct_on_column: None,
                limit: None,
                offset: None,
            },
        }
    }

    /// Sort ascending by a column
    pub fn order_by(self, field: &str) -> Self {
        self.push_order(field, OrderByDirection::Asc)
    }

    /// Sort descending by a column
    pub fn order_by_desc(self, field: &str) -> Self {
        self.push_order(field, OrderByDirection::Desc)
    }

    /// Keep rows where `field = value`; repeated calls are ANDed
    pub fn filter_where(mut self, field: &str, value: impl Into<DynamicValue>) -> Self {
        let condition = ConditionExpression::equals(field, value.into());
        self.query.where_condition = Some(match self.query.where_condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Limit the number of results
    pub fn limit(mut self, n: u64) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Skip the first `n` results
    pub fn offset(mut self, n: u64) -> Self {
        self.query.offset = Some(n);
        self
    }

    /// Build the final query
    pub fn build(self) -> Query {
        self.query
    }

    fn push_order(mut self, field: &str, direction: OrderByDirection) -> Self {
        self.query.order_by_clause.push(OrderByClause {
            order_by_column: to_snake_case(field),
            order_by_direction: direction,
        });
        self
    }
}

impl From<QueryBuilder> for Query {
    fn from(builder: QueryBuilder) -> Self {
        builder.build()
    }
}

/// `createdAt` -> `created_at`; already snake_case names pass through
///
/// Runs of capitals stay one word: `userID` -> `user_id`, `HTTPHost` -> `http_host`.
pub fn to_snake_case(field: &str) -> String {
    let chars: Vec<char> = field.chars().collect();
    let mut out = String::with_capacity(field.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                None | Some('_') => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if starts_word {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

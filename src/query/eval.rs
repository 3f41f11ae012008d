//! Client-side query evaluation
//!
//! Decides whether a pushed record belongs to a subscription and where it
//! sorts. Only the operators the builder can produce need to be exact; the
//! platform remains the source of truth for results.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use super::ast::{ConditionExpression, ConditionOperator, OrderByDirection, Query};
use crate::models::Record;

impl Query {
    /// Whether a record satisfies the WHERE condition
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(condition) = &self.where_condition {
            if !truthy(&condition.evaluate(record)) {
                return false;
            }
        }
        true
    }

    /// Order two records by the ORDER BY clauses
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for clause in &self.order_by_clause {
            let left = a.get(&clause.order_by_column).unwrap_or(&Value::Null);
            let right = b.get(&clause.order_by_column).unwrap_or(&Value::Null);
            let ordering = compare_values(left, right);
            let ordering = match clause.order_by_direction {
                OrderByDirection::Asc => ordering,
                OrderByDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl ConditionExpression {
    /// Evaluate against a record
    pub fn evaluate(&self, record: &Record) -> Value {
        match self {
            ConditionExpression::ColumnExpression { field } => {
                record.get(field).cloned().unwrap_or(Value::Null)
            }
            ConditionExpression::LiteralExpression { value } => value.to_json(),
            ConditionExpression::InfixOperatorExpression { left, op, right } => {
                let l = left.evaluate(record);
                let r = right.evaluate(record);
                Value::Bool(apply(*op, &l, &r))
            }
        }
    }
}

fn apply(op: ConditionOperator, l: &Value, r: &Value) -> bool {
    match op {
        ConditionOperator::OpAnd => truthy(l) && truthy(r),
        ConditionOperator::OpOr => truthy(l) || truthy(r),
        ConditionOperator::OpEqual => values_equal(l, r),
        ConditionOperator::OpNotEqual => !values_equal(l, r),
        ConditionOperator::OpGreaterThan => compare_values(l, r) == Ordering::Greater,
        ConditionOperator::OpGreaterThanOrEqual => compare_values(l, r) != Ordering::Less,
        ConditionOperator::OpLessThan => compare_values(l, r) == Ordering::Less,
        ConditionOperator::OpLessThanOrEqual => compare_values(l, r) != Ordering::Greater,
    }
}

fn truthy(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        // UUIDs may differ in case between client and server
        (Value::String(a), Value::String(b)) => {
            a.eq_ignore_ascii_case(b) || compare_values(l, r) == Ordering::Equal
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => l == r,
    }
}

/// Total order over JSON scalars: null < bool < number < string
fn compare_values(l: &Value, r: &Value) -> Ordering {
    match (l, r) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            _ => a.cmp(b),
        },
        _ => rank(l).cmp(&rank(r)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

#[cfg(test)]
mod tests {
    use super::super::ast::query;
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_filter_matches_uuid_case_insensitively() {
        let q = query("likes")
            .filter_where(
                "postId",
                uuid::Uuid::parse_str("5E3F2C4A-0D5E-4A43-9A7B-0A6A1F7D1C11").unwrap(),
            )
            .build();
        let like = record(json!({ "post_id": "5E3F2C4A-0D5E-4A43-9A7B-0A6A1F7D1C11" }));
        let other = record(json!({ "post_id": "00000000-0000-0000-0000-000000000000" }));
        assert!(q.matches(&like));
        assert!(!q.matches(&other));
    }

    #[test]
    fn test_query_without_condition_matches_everything() {
        let q = query("posts").build();
        assert!(q.matches(&record(json!({ "body": "x" }))));
    }

    #[test]
    fn test_compare_timestamps_across_offsets() {
        let q = query("posts").order_by("createdAt").build();
        let earlier = record(json!({ "created_at": "2022-06-01T14:00:00+02:00" }));
        let later = record(json!({ "created_at": "2022-06-01T12:30:00+00:00" }));
        assert_eq!(q.compare(&earlier, &later), Ordering::Less);
    }

    #[test]
    fn test_compare_desc() {
        let q = query("posts").order_by_desc("rank").build();
        let low = record(json!({ "rank": 1 }));
        let high = record(json!({ "rank": 2 }));
        assert_eq!(q.compare(&low, &high), Ordering::Greater);
    }

    #[test]
    fn test_missing_column_sorts_first() {
        let q = query("posts").order_by("createdAt").build();
        let missing = record(json!({}));
        let present = record(json!({ "created_at": "2022-06-01T12:30:00+00:00" }));
        assert_eq!(q.compare(&missing, &present), Ordering::Less);
    }
}

//! Queries
//!
//! Builder for the platform's realtime queries plus the minimal client-side
//! evaluation needed to keep a subscription's result set ordered:
//!
//! - **AST**: the `DynamicSQLQuery` wire shape and a builder
//! - **Eval**: `matches` / `compare` over records
//!
//! # Examples
//!
//! ```rust
//! use thinpost::query::{query, QueryState};
//!
//! let likes = query("likes").filter_where("postId", "some-id").build();
//! assert_eq!(likes.table, "likes");
//!
//! let state: QueryState<Vec<u8>> = QueryState::Loading;
//! assert!(state.is_loading());
//! ```

mod ast;
mod eval;

pub use ast::{
    query, to_snake_case, ConditionExpression, ConditionOperator, DynamicValue, OrderByClause,
    OrderByDirection, Query, QueryBuilder, SelectedColumns,
};

/// Result of a realtime query as seen by a view
///
/// `Loading` is the "not yet available" sentinel: the subscription exists but
/// the platform has not delivered its first result set.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Loading,
    Ready(T),
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState::Loading
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    /// The delivered value, if any
    pub fn ready(&self) -> Option<&T> {
        match self {
            QueryState::Loading => None,
            QueryState::Ready(value) => Some(value),
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            QueryState::Loading => None,
            QueryState::Ready(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::Ready(value) => QueryState::Ready(f(value)),
        }
    }

    /// Like `map`, for conversions that can fail
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<QueryState<U>, E> {
        match self {
            QueryState::Loading => Ok(QueryState::Loading),
            QueryState::Ready(value) => f(value).map(QueryState::Ready),
        }
    }
}

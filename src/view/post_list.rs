use crate::error::BackendResult;
use crate::models::{Post, Record, Table};
use crate::query::{query, Query, QueryState};

/// The post column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostList {
    /// No result set yet; render the loading indicator and no rows
    Loading,
    /// Posts, most recent first
    Posts(Vec<Post>),
}

impl PostList {
    /// All posts, oldest first, as the platform orders them
    pub fn query() -> Query {
        query(Post::NAME).order_by("createdAt").build()
    }

    /// Build from the raw subscription state
    pub fn from_state(state: &QueryState<Vec<Record>>) -> BackendResult<Self> {
        match state {
            QueryState::Loading => Ok(PostList::Loading),
            QueryState::Ready(records) => Ok(Self::from_posts(Post::from_records(records)?)),
        }
    }

    /// Build from posts in query order
    pub fn from_posts(mut posts: Vec<Post>) -> Self {
        posts.reverse();
        PostList::Posts(posts)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PostList::Loading)
    }

    /// Rows to render; empty while loading
    pub fn posts(&self) -> &[Post] {
        match self {
            PostList::Loading => &[],
            PostList::Posts(posts) => posts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OrderByDirection;
    use serde_json::json;

    fn post(body: &str, created_at: &str) -> Record {
        json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "body": body,
            "created_at": created_at,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_query_orders_by_creation() {
        let q = PostList::query();
        assert_eq!(q.table, "posts");
        assert_eq!(q.order_by_clause[0].order_by_column, "created_at");
        assert_eq!(q.order_by_clause[0].order_by_direction, OrderByDirection::Asc);
    }

    #[test]
    fn test_loading_renders_no_rows() {
        let list = PostList::from_state(&QueryState::Loading).unwrap();
        assert!(list.is_loading());
        assert!(list.posts().is_empty());
    }

    #[test]
    fn test_newest_post_first() {
        let state = QueryState::Ready(vec![
            post("A", "2022-06-01T10:00:00Z"),
            post("B", "2022-06-01T11:00:00Z"),
        ]);
        let list = PostList::from_state(&state).unwrap();
        let bodies: Vec<&str> = list.posts().iter().map(|p| p.body.as_str()).collect();
        assert_eq!(bodies, ["B", "A"]);
    }

    #[test]
    fn test_empty_result_is_not_loading() {
        let list = PostList::from_state(&QueryState::Ready(Vec::new())).unwrap();
        assert_eq!(list, PostList::Posts(Vec::new()));
    }

    #[test]
    fn test_malformed_post_is_an_error() {
        let mut record = Record::new();
        record.insert("body".into(), json!("no id"));
        assert!(PostList::from_state(&QueryState::Ready(vec![record])).is_err());
    }
}

use uuid::Uuid;

use crate::models::{Like, NewLike, Record, Table};
use crate::query::{query, Query, QueryState};

/// Like control of one post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeButton {
    post_id: Uuid,
    count: usize,
}

impl LikeButton {
    /// Likes of one post
    pub fn query(post_id: Uuid) -> Query {
        query(Like::NAME).filter_where("postId", post_id).build()
    }

    /// `None` while the likes have not been delivered; the control renders nothing
    pub fn from_state(post_id: Uuid, state: &QueryState<Vec<Record>>) -> Option<Self> {
        let records = state.ready()?;
        let count = records
            .iter()
            .filter(|record| likes_post(record, &post_id))
            .count();
        Some(Self { post_id, count })
    }

    pub fn post_id(&self) -> Uuid {
        self.post_id
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn label(&self) -> String {
        format!("♡ {}", self.count)
    }

    /// The record one activation creates
    pub fn like(&self) -> NewLike {
        NewLike {
            post_id: self.post_id,
        }
    }

    /// Create one like; existing likes are left alone
    #[cfg(feature = "native")]
    pub async fn activate<B>(&self, backend: &B) -> crate::error::BackendResult<Like>
    where
        B: crate::backend::Backend + ?Sized,
    {
        use crate::backend::BackendExt;

        backend.insert::<NewLike, Like>(&self.like()).await
    }
}

fn likes_post(record: &Record, post_id: &Uuid) -> bool {
    record
        .get("post_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .is_some_and(|id| id == *post_id)
}

//! In-process backend
//!
//! Keeps records in memory and delivers realtime updates to subscriptions
//! immediately. Delivery can be paused to observe loading states.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use super::{Backend, Subscription};
use crate::datasync::{ResultSet, StateSender};
use crate::error::{BackendError, BackendResult};
use crate::models::{Record, User};
use crate::query::{Query, QueryState};

/// In-memory [`Backend`]
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Record>>,
    subscriptions: Vec<MemorySubscription>,
    next_subscription: u64,
    user: Option<User>,
    created: Vec<(String, Record)>,
    paused: bool,
}

struct MemorySubscription {
    id: u64,
    result: ResultSet,
    state: StateSender,
}

impl MemorySubscription {
    fn publish(&self) {
        self.state
            .send_replace(QueryState::Ready(self.result.records().to_vec()));
    }
}

impl MemoryBackend {
    /// A backend with no session
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with a logged in user
    pub fn logged_in(email: &str) -> Self {
        let backend = Self::new();
        backend.lock().user = Some(User {
            id: Uuid::new_v4(),
            email: email.to_string(),
        });
        backend
    }

    /// Hold back realtime deliveries; subscriptions stay `Loading`
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Deliver current results to every subscription
    pub fn resume(&self) {
        let mut inner = self.lock();
        inner.paused = false;
        for subscription in &inner.subscriptions {
            subscription.publish();
        }
    }

    /// Store a record without going through `create_record`
    pub fn seed(&self, table: &str, record: Record) {
        let mut inner = self.lock();
        inner.store(table, record);
    }

    /// Every record of a table, in insertion order
    pub fn records(&self, table: &str) -> Vec<Record> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Every `create_record` call received, in order
    pub fn created(&self) -> Vec<(String, Record)> {
        self.lock().created.clone()
    }

    /// Number of subscriptions still alive
    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    fn matching(&self, query: &Query) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| query.compare(a, b));
        let offset = query.offset.unwrap_or(0) as usize;
        records.into_iter().skip(offset).collect()
    }

    fn store(&mut self, table: &str, record: Record) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());

        let paused = self.paused;
        self.subscriptions.retain(|s| !s.state.is_closed());
        for subscription in &mut self.subscriptions {
            if subscription.result.query().table == table
                && subscription.result.insert(record.clone())
                && !paused
            {
                subscription.publish();
            }
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn current_user(&self) -> BackendResult<Option<User>> {
        Ok(self.lock().user.clone())
    }

    async fn subscribe(&self, query: Query) -> BackendResult<Subscription> {
        let mut inner = self.lock();
        let result = ResultSet::new(query.clone(), inner.matching(&query));
        let initial = if inner.paused {
            QueryState::Loading
        } else {
            QueryState::Ready(result.records().to_vec())
        };
        let (state, receiver) = watch::channel(initial);

        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner
            .subscriptions
            .push(MemorySubscription { id, result, state });

        let handle = Arc::clone(&self.inner);
        Ok(Subscription::new(receiver).with_on_drop(move || {
            let mut inner = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.subscriptions.retain(|s| s.id != id);
        }))
    }

    async fn query(&self, query: Query) -> BackendResult<Vec<Record>> {
        let inner = self.lock();
        let mut records = inner.matching(&query);
        if let Some(limit) = query.limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    async fn create_record(&self, table: &str, mut record: Record) -> BackendResult<Record> {
        let mut inner = self.lock();
        if inner.user.is_none() {
            return Err(BackendError::NotLoggedIn);
        }
        inner.created.push((table.to_string(), record.clone()));

        record
            .entry("id")
            .or_insert_with(|| Uuid::new_v4().to_string().into());
        record
            .entry("created_at")
            .or_insert_with(|| Utc::now().to_rfc3339().into());

        tracing::debug!(table, "Memory backend insert");
        inner.store(table, record.clone());
        Ok(record)
    }

    async fn logout(&self) -> BackendResult<()> {
        self.lock().user = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::query;
    use serde_json::json;

    fn body(record: &Record) -> &str {
        record["body"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_subscription_sees_inserts() {
        let backend = MemoryBackend::logged_in("ada@example.com");
        let mut posts = backend
            .subscribe(query("posts").order_by("createdAt").build())
            .await
            .unwrap();
        assert_eq!(posts.ready().await.unwrap().len(), 0);

        let mut record = Record::new();
        record.insert("body".into(), json!("hello"));
        backend.create_record("posts", record).await.unwrap();

        posts.changed().await.unwrap();
        let state = posts.state();
        assert_eq!(body(&state.ready().unwrap()[0]), "hello");
    }

    #[tokio::test]
    async fn test_typed_state() {
        use crate::models::{NewPost, Post};
        use crate::backend::BackendExt;

        let backend = MemoryBackend::logged_in("ada@example.com");
        let posts = backend.subscribe(query("posts").build()).await.unwrap();
        let post: Post = backend
            .insert(&NewPost {
                body: "typed".to_string(),
            })
            .await
            .unwrap();

        let state = posts.typed::<Post>().unwrap();
        assert_eq!(state, QueryState::Ready(vec![post]));
    }

    #[tokio::test]
    async fn test_create_record_fills_id_and_timestamp() {
        let backend = MemoryBackend::logged_in("ada@example.com");
        let created = backend.create_record("posts", Record::new()).await.unwrap();
        assert!(Uuid::parse_str(created["id"].as_str().unwrap()).is_ok());
        assert!(created["created_at"].is_string());
        assert_eq!(backend.created().len(), 1);
    }

    #[tokio::test]
    async fn test_create_record_requires_session() {
        let backend = MemoryBackend::new();
        let result = backend.create_record("posts", Record::new()).await;
        assert!(matches!(result, Err(BackendError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_paused_subscription_is_loading() {
        let backend = MemoryBackend::logged_in("ada@example.com");
        backend.pause();
        let posts = backend.subscribe(query("posts").build()).await.unwrap();
        assert!(posts.state().is_loading());

        backend.resume();
        assert_eq!(posts.state(), QueryState::Ready(Vec::new()));
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_removed() {
        let backend = MemoryBackend::new();
        let posts = backend.subscribe(query("posts").build()).await.unwrap();
        assert_eq!(backend.subscription_count(), 1);
        drop(posts);
        assert_eq!(backend.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_query_applies_filter_and_limit() {
        let backend = MemoryBackend::new();
        for (id, post_id) in [("1", "a"), ("2", "b"), ("3", "a")] {
            let record = json!({ "id": id, "post_id": post_id });
            backend.seed("likes", record.as_object().unwrap().clone());
        }

        let likes = backend
            .query(query("likes").filter_where("postId", "a").build())
            .await
            .unwrap();
        assert_eq!(likes.len(), 2);

        let limited = backend.query(query("likes").limit(1).build()).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_user() {
        let backend = MemoryBackend::logged_in("ada@example.com");
        assert!(backend.current_user().await.unwrap().is_some());
        backend.logout().await.unwrap();
        assert!(backend.current_user().await.unwrap().is_none());
    }
}

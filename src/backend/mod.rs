//! Backend Platform
//!
//! The client API the views consume: session user, realtime queries, record
//! creation and logout. Two implementations:
//!
//! - [`RemoteBackend`]: the hosted platform over DataSync
//! - [`MemoryBackend`]: in-process, for tests and offline previews

mod memory;
mod remote;

pub use memory::MemoryBackend;
pub use remote::RemoteBackend;

use async_trait::async_trait;

use crate::datasync::StateReceiver;
use crate::error::{BackendError, BackendResult};
use crate::models::{Insert, Record, Table, User};
use crate::query::{Query, QueryState};

/// Client API of the backend platform
#[async_trait]
pub trait Backend: Send + Sync {
    /// The logged in user, if the session is valid
    async fn current_user(&self) -> BackendResult<Option<User>>;

    /// Start a realtime query
    async fn subscribe(&self, query: Query) -> BackendResult<Subscription>;

    /// One-shot query
    async fn query(&self, query: Query) -> BackendResult<Vec<Record>>;

    /// Insert a record, returning the platform's copy (with id and timestamps)
    async fn create_record(&self, table: &str, record: Record) -> BackendResult<Record>;

    /// End the session
    async fn logout(&self) -> BackendResult<()>;
}

/// Typed helpers over any [`Backend`]
#[async_trait]
pub trait BackendExt: Backend {
    /// Insert a typed payload and decode the created record
    async fn insert<I, T>(&self, payload: &I) -> BackendResult<T>
    where
        I: Insert + Sync,
        T: Table + Send,
    {
        let record = payload.into_record()?;
        let created = self.create_record(I::TABLE, record).await?;
        T::from_record(&created)
    }
}

impl<B: Backend + ?Sized> BackendExt for B {}

/// A live realtime query
///
/// Starts at [`QueryState::Loading`] and turns `Ready` once the platform has
/// delivered the first result set. Unsubscribes on drop.
pub struct Subscription {
    state: StateReceiver,
    on_drop: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(state: StateReceiver) -> Self {
        Self {
            state,
            on_drop: None,
        }
    }

    /// Run `f` when the subscription is dropped
    pub fn with_on_drop(mut self, f: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_drop = Some(Box::new(f));
        self
    }

    /// Current state of the raw result set
    pub fn state(&self) -> QueryState<Vec<Record>> {
        self.state.borrow().clone()
    }

    /// Current state decoded as `T`
    pub fn typed<T: Table>(&self) -> BackendResult<QueryState<Vec<T>>> {
        let state = self.state.borrow();
        match &*state {
            QueryState::Loading => Ok(QueryState::Loading),
            QueryState::Ready(records) => T::from_records(records).map(QueryState::Ready),
        }
    }

    /// Wait for the next change
    pub async fn changed(&mut self) -> BackendResult<()> {
        self.state
            .changed()
            .await
            .map_err(|_| BackendError::SubscriptionClosed)
    }

    /// Wait until the first result set has arrived
    pub async fn ready(&mut self) -> BackendResult<Vec<Record>> {
        loop {
            if let QueryState::Ready(records) = &*self.state.borrow_and_update() {
                return Ok(records.clone());
            }
            self.changed().await?;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_subscription_ready_waits_for_delivery() {
        let (tx, rx) = watch::channel(QueryState::Loading);
        let mut subscription = Subscription::new(rx);
        assert!(subscription.state().is_loading());

        tokio::spawn(async move {
            let mut record = Record::new();
            record.insert("body".into(), serde_json::json!("A"));
            tx.send_replace(QueryState::Ready(vec![record]));
            // keep the channel open until the reader is done
            tx.closed().await;
        });

        let records = subscription.ready().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_closed() {
        let (tx, rx) = watch::channel(QueryState::Loading);
        let mut subscription = Subscription::new(rx);
        drop(tx);
        assert!(matches!(
            subscription.ready().await,
            Err(BackendError::SubscriptionClosed)
        ));
    }

    #[test]
    fn test_subscription_runs_on_drop() {
        let (_tx, rx) = watch::channel(QueryState::Loading);
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dropped);
        let subscription = Subscription::new(rx).with_on_drop(move || flag.store(true, Ordering::SeqCst));
        drop(subscription);
        assert!(dropped.load(Ordering::SeqCst));
    }
}

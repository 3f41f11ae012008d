//! DataSync Driver
//!
//! Transport-independent protocol state. Commands queue outgoing messages,
//! incoming server messages resolve pending requests and update live
//! subscriptions. The native client and the browser client both pump one
//! of these; neither holds protocol state of its own.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{oneshot, watch};

use super::messages::{ClientMessage, RequestId, ServerMessage, SubscriptionId};
use super::result_set::ResultSet;
use crate::error::{BackendError, BackendResult};
use crate::models::Record;
use crate::query::{Query, QueryState};

/// Sender side of a subscription's state
pub type StateSender = watch::Sender<QueryState<Vec<Record>>>;

/// Receiver side of a subscription's state
pub type StateReceiver = watch::Receiver<QueryState<Vec<Record>>>;

/// Local, stable id of a subscription
///
/// Survives reconnects, unlike the platform's subscription id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

enum Pending {
    Query(oneshot::Sender<BackendResult<Vec<Record>>>),
    Subscribe {
        handle: SubscriptionHandle,
        query: Query,
        state: StateSender,
        cancelled: bool,
    },
    Unsubscribe,
    CreateRecord(oneshot::Sender<BackendResult<Record>>),
}

enum HandleState {
    Requested(RequestId),
    Live(SubscriptionId),
}

struct LiveQuery {
    handle: SubscriptionHandle,
    result: ResultSet,
    state: StateSender,
}

impl LiveQuery {
    fn publish(&self) {
        self.state
            .send_replace(QueryState::Ready(self.result.records().to_vec()));
    }
}

/// DataSync protocol state machine
pub struct Driver {
    connected: bool,
    next_request_id: RequestId,
    next_handle: u64,
    outbox: VecDeque<ClientMessage>,
    pending: HashMap<RequestId, Pending>,
    live: HashMap<SubscriptionId, LiveQuery>,
    handles: HashMap<SubscriptionHandle, HandleState>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// Create a disconnected driver; commands queue until `on_connected`
    pub fn new() -> Self {
        Self {
            connected: false,
            next_request_id: 1,
            next_handle: 1,
            outbox: VecDeque::new(),
            pending: HashMap::new(),
            live: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of subscriptions the platform has acknowledged
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Issue a one-shot query
    pub fn query(&mut self, query: Query) -> oneshot::Receiver<BackendResult<Vec<Record>>> {
        let (tx, rx) = oneshot::channel();
        let request_id = self.request_id();
        self.pending.insert(request_id, Pending::Query(tx));
        self.outbox
            .push_back(ClientMessage::DataSyncQuery { query, request_id });
        rx
    }

    /// Start a realtime query; the receiver starts at `Loading`
    pub fn subscribe(&mut self, query: Query) -> (SubscriptionHandle, StateReceiver) {
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;

        let (state, receiver) = watch::channel(QueryState::Loading);
        self.request_subscription(handle, query, state);
        (handle, receiver)
    }

    /// Stop a realtime query
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        match self.handles.remove(&handle) {
            Some(HandleState::Live(subscription_id)) => {
                self.live.remove(&subscription_id);
                self.delete_subscription(subscription_id);
            }
            Some(HandleState::Requested(request_id)) => {
                // Not acknowledged yet; delete it once it is
                if let Some(Pending::Subscribe { cancelled, .. }) =
                    self.pending.get_mut(&request_id)
                {
                    *cancelled = true;
                }
            }
            None => {}
        }
    }

    /// Insert a record into `table`
    pub fn create_record(
        &mut self,
        table: &str,
        record: Record,
    ) -> oneshot::Receiver<BackendResult<Record>> {
        let (tx, rx) = oneshot::channel();
        let request_id = self.request_id();
        self.pending.insert(request_id, Pending::CreateRecord(tx));
        self.outbox.push_back(ClientMessage::CreateRecordMessage {
            table: table.to_string(),
            record,
            request_id,
        });
        rx
    }

    /// The transport is open; queued messages may be sent
    pub fn on_connected(&mut self) {
        tracing::debug!(queued = self.outbox.len(), "DataSync connected");
        self.connected = true;
    }

    /// The transport closed
    ///
    /// Outstanding queries and inserts fail with `Disconnected`. Subscriptions
    /// are queued for re-creation and keep their last known state.
    pub fn on_disconnect(&mut self) {
        tracing::debug!(
            pending = self.pending.len(),
            live = self.live.len(),
            "DataSync disconnected"
        );
        self.connected = false;
        self.outbox.clear();
        self.handles.clear();

        let mut resubscribe = Vec::new();
        for (_, pending) in self.pending.drain() {
            match pending {
                Pending::Query(tx) => {
                    let _ = tx.send(Err(BackendError::Disconnected));
                }
                Pending::CreateRecord(tx) => {
                    let _ = tx.send(Err(BackendError::Disconnected));
                }
                Pending::Subscribe {
                    handle,
                    query,
                    state,
                    cancelled,
                } => {
                    if !cancelled {
                        resubscribe.push((handle, query, state));
                    }
                }
                Pending::Unsubscribe => {}
            }
        }
        for (_, live) in self.live.drain() {
            resubscribe.push((live.handle, live.result.query().clone(), live.state));
        }

        resubscribe.sort_by_key(|(handle, _, _)| handle.0);
        for (handle, query, state) in resubscribe {
            self.request_subscription(handle, query, state);
        }
    }

    /// The transport is gone for good
    ///
    /// Everything outstanding fails and every subscription receiver observes
    /// a closed channel.
    pub fn shutdown(&mut self) {
        self.connected = false;
        self.outbox.clear();
        self.handles.clear();
        self.live.clear();
        for (_, pending) in self.pending.drain() {
            match pending {
                Pending::Query(tx) => {
                    let _ = tx.send(Err(BackendError::Disconnected));
                }
                Pending::CreateRecord(tx) => {
                    let _ = tx.send(Err(BackendError::Disconnected));
                }
                Pending::Subscribe { .. } | Pending::Unsubscribe => {}
            }
        }
    }

    /// Take the messages that should be written to the transport now
    pub fn drain_outgoing(&mut self) -> Vec<ClientMessage> {
        if !self.connected {
            return Vec::new();
        }
        self.outbox.drain(..).collect()
    }

    /// Apply one message from the platform
    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::DataSyncResult { result, request_id } => {
                match self.pending.remove(&request_id) {
                    Some(Pending::Query(tx)) => {
                        let _ = tx.send(Ok(result));
                    }
                    _ => tracing::debug!(request_id, "Unexpected DataSyncResult"),
                }
            }
            ServerMessage::DataSyncError {
                request_id,
                error_message,
            } => self.fail_request(request_id, error_message),
            ServerMessage::FailedToDecodeMessageError { error_message } => {
                tracing::warn!(error = %error_message, "Platform could not decode a message");
            }
            ServerMessage::DidCreateDataSubscription {
                request_id,
                subscription_id,
                result,
            } => self.subscription_created(request_id, subscription_id, result),
            ServerMessage::DidDeleteDataSubscription { request_id, .. } => {
                self.pending.remove(&request_id);
            }
            ServerMessage::DidInsert {
                subscription_id,
                record,
            } => {
                if let Some(live) = self.live.get_mut(&subscription_id) {
                    if live.result.insert(record) {
                        live.publish();
                    }
                }
            }
            ServerMessage::DidUpdate {
                subscription_id,
                id,
                change_set,
            } => {
                if let Some(live) = self.live.get_mut(&subscription_id) {
                    if live.result.update(&id, &change_set) {
                        live.publish();
                    }
                }
            }
            ServerMessage::DidDelete {
                subscription_id,
                id,
            } => {
                if let Some(live) = self.live.get_mut(&subscription_id) {
                    if live.result.delete(&id) {
                        live.publish();
                    }
                }
            }
            ServerMessage::DidCreateRecord { request_id, record } => {
                match self.pending.remove(&request_id) {
                    Some(Pending::CreateRecord(tx)) => {
                        let _ = tx.send(Ok(record));
                    }
                    _ => tracing::debug!(request_id, "Unexpected DidCreateRecord"),
                }
            }
            ServerMessage::Unknown => {
                tracing::debug!("Ignoring unknown DataSync message");
            }
        }
    }

    fn request_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    fn request_subscription(&mut self, handle: SubscriptionHandle, query: Query, state: StateSender) {
        let request_id = self.request_id();
        self.outbox.push_back(ClientMessage::CreateDataSubscription {
            query: query.clone(),
            request_id,
        });
        self.pending.insert(
            request_id,
            Pending::Subscribe {
                handle,
                query,
                state,
                cancelled: false,
            },
        );
        self.handles.insert(handle, HandleState::Requested(request_id));
    }

    fn delete_subscription(&mut self, subscription_id: SubscriptionId) {
        let request_id = self.request_id();
        self.pending.insert(request_id, Pending::Unsubscribe);
        self.outbox.push_back(ClientMessage::DeleteDataSubscription {
            subscription_id,
            request_id,
        });
    }

    fn subscription_created(
        &mut self,
        request_id: RequestId,
        subscription_id: SubscriptionId,
        result: Vec<Record>,
    ) {
        let Some(Pending::Subscribe {
            handle,
            query,
            state,
            cancelled,
        }) = self.pending.remove(&request_id)
        else {
            tracing::debug!(request_id, "Unexpected DidCreateDataSubscription");
            return;
        };

        if cancelled {
            self.delete_subscription(subscription_id);
            return;
        }

        let live = LiveQuery {
            handle,
            result: ResultSet::new(query, result),
            state,
        };
        live.publish();
        tracing::debug!(%subscription_id, table = %live.result.query().table, "Subscription live");
        self.live.insert(subscription_id, live);
        self.handles.insert(handle, HandleState::Live(subscription_id));
    }

    fn fail_request(&mut self, request_id: RequestId, message: String) {
        tracing::warn!(request_id, error = %message, "DataSync request failed");
        match self.pending.remove(&request_id) {
            Some(Pending::Query(tx)) => {
                let _ = tx.send(Err(BackendError::Server(message)));
            }
            Some(Pending::CreateRecord(tx)) => {
                let _ = tx.send(Err(BackendError::Server(message)));
            }
            Some(Pending::Subscribe { handle, .. }) => {
                // Dropping the sender closes every receiver
                self.handles.remove(&handle);
            }
            Some(Pending::Unsubscribe) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::query;
    use serde_json::json;
    use uuid::Uuid;

    const SUB: &str = "0b4e4f9e-57a4-4b52-8b2b-6f7f16d4ad3e";

    fn post(id: &str, body: &str, created_at: &str) -> Record {
        json!({ "id": id, "body": body, "created_at": created_at })
            .as_object()
            .unwrap()
            .clone()
    }

    fn connected() -> Driver {
        let mut driver = Driver::new();
        driver.on_connected();
        driver
    }

    fn sent_request_id(driver: &mut Driver) -> RequestId {
        let sent = driver.drain_outgoing();
        assert_eq!(sent.len(), 1, "expected one message, got {:?}", sent);
        sent[0].request_id()
    }

    #[test]
    fn test_messages_queue_until_connected() {
        let mut driver = Driver::new();
        let (_handle, _rx) = driver.subscribe(query("posts").build());
        assert!(driver.drain_outgoing().is_empty());

        driver.on_connected();
        let sent = driver.drain_outgoing();
        assert!(matches!(sent[0], ClientMessage::CreateDataSubscription { .. }));
    }

    #[test]
    fn test_subscription_loading_then_ready() {
        let mut driver = connected();
        let (_handle, rx) = driver.subscribe(query("posts").order_by("createdAt").build());
        assert!(rx.borrow().is_loading());

        let request_id = sent_request_id(&mut driver);
        driver.handle_message(ServerMessage::DidCreateDataSubscription {
            request_id,
            subscription_id: Uuid::parse_str(SUB).unwrap(),
            result: vec![post(
                "00000000-0000-0000-0000-00000000000a",
                "A",
                "2022-06-01T10:00:00+00:00",
            )],
        });

        assert_eq!(rx.borrow().ready().map(|r| r.len()), Some(1));
        assert_eq!(driver.live_count(), 1);
        assert_eq!(driver.pending_count(), 0);
    }

    #[test]
    fn test_did_insert_updates_state() {
        let mut driver = connected();
        let (_handle, rx) = driver.subscribe(query("posts").order_by("createdAt").build());
        let request_id = sent_request_id(&mut driver);
        let subscription_id = Uuid::parse_str(SUB).unwrap();
        driver.handle_message(ServerMessage::DidCreateDataSubscription {
            request_id,
            subscription_id,
            result: Vec::new(),
        });

        driver.handle_message(ServerMessage::DidInsert {
            subscription_id,
            record: post(
                "00000000-0000-0000-0000-00000000000b",
                "B",
                "2022-06-01T11:00:00+00:00",
            ),
        });

        let state = rx.borrow().clone();
        assert_eq!(state.ready().unwrap()[0]["body"], "B");
    }

    #[test]
    fn test_create_record_reply() {
        let mut driver = connected();
        let mut record = Record::new();
        record.insert("body".into(), json!("hello"));
        let mut rx = driver.create_record("posts", record);
        let request_id = sent_request_id(&mut driver);

        let mut created = Record::new();
        created.insert("body".into(), json!("hello"));
        driver.handle_message(ServerMessage::DidCreateRecord {
            request_id,
            record: created,
        });

        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(reply["body"], "hello");
    }

    #[test]
    fn test_query_error_is_reported() {
        let mut driver = connected();
        let mut rx = driver.query(query("secrets").build());
        let request_id = sent_request_id(&mut driver);
        driver.handle_message(ServerMessage::DataSyncError {
            request_id,
            error_message: "denied".into(),
        });

        let reply = rx.try_recv().unwrap();
        assert!(matches!(reply, Err(BackendError::Server(msg)) if msg == "denied"));
    }

    #[test]
    fn test_failed_subscription_closes_receiver() {
        let mut driver = connected();
        let (_handle, rx) = driver.subscribe(query("secrets").build());
        let request_id = sent_request_id(&mut driver);
        driver.handle_message(ServerMessage::DataSyncError {
            request_id,
            error_message: "denied".into(),
        });
        assert!(rx.has_changed().is_err());
    }

    #[test]
    fn test_unsubscribe_live() {
        let mut driver = connected();
        let (handle, _rx) = driver.subscribe(query("posts").build());
        let request_id = sent_request_id(&mut driver);
        let subscription_id = Uuid::parse_str(SUB).unwrap();
        driver.handle_message(ServerMessage::DidCreateDataSubscription {
            request_id,
            subscription_id,
            result: Vec::new(),
        });

        driver.unsubscribe(handle);
        let sent = driver.drain_outgoing();
        assert!(matches!(
            sent[0],
            ClientMessage::DeleteDataSubscription { subscription_id: id, .. } if id == subscription_id
        ));
        assert_eq!(driver.live_count(), 0);
    }

    #[test]
    fn test_unsubscribe_before_ack_deletes_on_ack() {
        let mut driver = connected();
        let (handle, _rx) = driver.subscribe(query("posts").build());
        let request_id = sent_request_id(&mut driver);
        driver.unsubscribe(handle);
        assert!(driver.drain_outgoing().is_empty());

        let subscription_id = Uuid::parse_str(SUB).unwrap();
        driver.handle_message(ServerMessage::DidCreateDataSubscription {
            request_id,
            subscription_id,
            result: Vec::new(),
        });

        let sent = driver.drain_outgoing();
        assert!(matches!(sent[0], ClientMessage::DeleteDataSubscription { .. }));
        assert_eq!(driver.live_count(), 0);
    }

    #[test]
    fn test_disconnect_fails_pending_and_resubscribes() {
        let mut driver = connected();
        let mut insert = driver.create_record("posts", Record::new());
        let (_handle, rx) = driver.subscribe(query("posts").build());
        let sent = driver.drain_outgoing();
        let subscribe_id = sent[1].request_id();
        driver.handle_message(ServerMessage::DidCreateDataSubscription {
            request_id: subscribe_id,
            subscription_id: Uuid::parse_str(SUB).unwrap(),
            result: vec![post(
                "00000000-0000-0000-0000-00000000000a",
                "A",
                "2022-06-01T10:00:00+00:00",
            )],
        });

        driver.on_disconnect();
        assert!(matches!(insert.try_recv().unwrap(), Err(BackendError::Disconnected)));
        // Last known state survives the reconnect
        assert_eq!(rx.borrow().ready().map(|r| r.len()), Some(1));

        driver.on_connected();
        let sent = driver.drain_outgoing();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], ClientMessage::CreateDataSubscription { .. }));
    }

    #[test]
    fn test_shutdown_closes_subscriptions() {
        let mut driver = connected();
        let (_handle, rx) = driver.subscribe(query("posts").build());
        let mut insert = driver.create_record("posts", Record::new());
        driver.shutdown();
        assert!(rx.has_changed().is_err());
        assert!(matches!(insert.try_recv().unwrap(), Err(BackendError::Disconnected)));
        assert!(driver.drain_outgoing().is_empty());
    }
}

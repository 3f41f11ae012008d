//! DataSync WebSocket Client
//!
//! Native transport for the [`Driver`]: one task owns the socket, reads
//! server messages into the driver and writes whatever the driver queued.
//! Callers touch the driver only under a short, non-async lock.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;

use super::driver::{Driver, StateReceiver, SubscriptionHandle};
use super::messages::ServerMessage;
use crate::error::{BackendError, BackendResult};
use crate::models::Record;
use crate::query::Query;

/// Connected DataSync client
pub struct DataSyncClient {
    driver: Arc<Mutex<Driver>>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl DataSyncClient {
    /// Open the websocket at `url` (see [`crate::auth::datasync_url`])
    pub async fn connect(url: &str) -> BackendResult<Self> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BackendError::WebSocket(e.to_string()))?;
        tracing::info!(host = %redact(url), "DataSync connected");

        let mut driver = Driver::new();
        driver.on_connected();
        let driver = Arc::new(Mutex::new(driver));
        let wake = Arc::new(Notify::new());

        let task = tokio::spawn(run(socket, Arc::clone(&driver), Arc::clone(&wake)));

        Ok(Self { driver, wake, task })
    }

    /// One-shot query
    pub async fn query(&self, query: Query) -> BackendResult<Vec<Record>> {
        let reply = {
            let mut driver = self.driver()?;
            driver.query(query)
        };
        self.wake.notify_one();
        reply.await.map_err(|_| BackendError::Disconnected)?
    }

    /// Start a realtime query
    pub fn subscribe(&self, query: Query) -> BackendResult<(SubscriptionHandle, StateReceiver)> {
        let subscription = {
            let mut driver = self.driver()?;
            driver.subscribe(query)
        };
        self.wake.notify_one();
        Ok(subscription)
    }

    /// Stop a realtime query; a no-op once the connection is gone
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        unsubscribe(&self.driver, &self.wake, handle);
    }

    /// A closure that unsubscribes `handle`, for use from `Drop`
    pub fn unsubscriber(&self, handle: SubscriptionHandle) -> impl FnOnce() + Send + Sync + 'static {
        let driver = Arc::clone(&self.driver);
        let wake = Arc::clone(&self.wake);
        move || unsubscribe(&driver, &wake, handle)
    }

    /// Insert a record and wait for the platform's copy of it
    pub async fn create_record(&self, table: &str, record: Record) -> BackendResult<Record> {
        let reply = {
            let mut driver = self.driver()?;
            driver.create_record(table, record)
        };
        self.wake.notify_one();
        reply.await.map_err(|_| BackendError::Disconnected)?
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.driver).is_connected()
    }

    /// Close the socket; outstanding requests fail
    pub fn close(&self) {
        self.task.abort();
        lock(&self.driver).shutdown();
    }

    fn driver(&self) -> BackendResult<MutexGuard<'_, Driver>> {
        let driver = lock(&self.driver);
        if driver.is_connected() {
            Ok(driver)
        } else {
            Err(BackendError::Disconnected)
        }
    }
}

impl Drop for DataSyncClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock(driver: &Mutex<Driver>) -> MutexGuard<'_, Driver> {
    driver.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn unsubscribe(driver: &Mutex<Driver>, wake: &Notify, handle: SubscriptionHandle) {
    let mut driver = lock(driver);
    if driver.is_connected() {
        driver.unsubscribe(handle);
        wake.notify_one();
    }
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Socket task: pump frames in both directions until either side closes
async fn run(socket: Socket, driver: Arc<Mutex<Driver>>, wake: Arc<Notify>) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            _ = wake.notified() => {}
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(message) => {
                            lock(&driver).handle_message(message);
                        }
                        Err(e) => tracing::warn!(error = %e, "Failed to parse DataSync message"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "DataSync closed by platform");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "DataSync receive error");
                    break;
                }
                None => break,
            },
        }

        // Replies may queue follow-ups (e.g. deleting a cancelled subscription)
        let outgoing = lock(&driver).drain_outgoing();
        let mut failed = false;
        for message in outgoing {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize DataSync message");
                    continue;
                }
            };
            tracing::debug!(request_id = message.request_id(), "DataSync send");
            if let Err(e) = sink.send(Message::Text(text)).await {
                tracing::warn!(error = %e, "DataSync send failed");
                failed = true;
                break;
            }
        }
        if failed {
            break;
        }
    }

    lock(&driver).shutdown();
    tracing::info!("DataSync connection finished");
}

/// Strip the access token before logging a URL
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

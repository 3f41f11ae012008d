//! DataSync
//!
//! Client side of the platform's realtime query protocol. Queries and record
//! inserts travel as JSON messages over a websocket; subscriptions receive
//! the initial result set followed by insert, update and delete events.
//!
//! The protocol state lives in [`Driver`], which does no IO and is shared by
//! the native [`DataSyncClient`] and the browser client.

mod driver;
mod messages;
mod result_set;

#[cfg(feature = "native")]
mod client;

pub use driver::{Driver, StateReceiver, StateSender, SubscriptionHandle};
pub use messages::{ClientMessage, RequestId, ServerMessage, SubscriptionId};
pub use result_set::ResultSet;

#[cfg(feature = "native")]
pub use client::DataSyncClient;

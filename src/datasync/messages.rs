//! DataSync Message Types
//!
//! Defines the message types exchanged with the platform's DataSync
//! websocket. Messages are JSON objects tagged by a `tag` field with
//! camelCase field names.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Record;
use crate::query::Query;

/// Client-chosen id correlating a request with its reply
pub type RequestId = u64;

/// Platform-chosen id of a live subscription
pub type SubscriptionId = Uuid;

/// Messages sent from client to platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// One-shot query
    DataSyncQuery { query: Query, request_id: RequestId },
    /// Start a realtime query
    CreateDataSubscription { query: Query, request_id: RequestId },
    /// Stop a realtime query
    DeleteDataSubscription {
        subscription_id: SubscriptionId,
        request_id: RequestId,
    },
    /// Insert one record
    CreateRecordMessage {
        table: String,
        record: Record,
        request_id: RequestId,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> RequestId {
        match self {
            ClientMessage::DataSyncQuery { request_id, .. }
            | ClientMessage::CreateDataSubscription { request_id, .. }
            | ClientMessage::DeleteDataSubscription { request_id, .. }
            | ClientMessage::CreateRecordMessage { request_id, .. } => *request_id,
        }
    }
}

/// Messages sent from platform to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to `DataSyncQuery`
    DataSyncResult {
        result: Vec<Record>,
        request_id: RequestId,
    },
    /// A request failed on the platform
    DataSyncError {
        request_id: RequestId,
        error_message: String,
    },
    /// The platform could not parse one of our messages
    FailedToDecodeMessageError { error_message: String },
    /// Reply to `CreateDataSubscription`, carrying the initial result set
    DidCreateDataSubscription {
        request_id: RequestId,
        subscription_id: SubscriptionId,
        result: Vec<Record>,
    },
    /// Reply to `DeleteDataSubscription`
    DidDeleteDataSubscription {
        request_id: RequestId,
        subscription_id: SubscriptionId,
    },
    /// A record entered a subscription's result set
    DidInsert {
        subscription_id: SubscriptionId,
        record: Record,
    },
    /// A record in a subscription's result set changed
    DidUpdate {
        subscription_id: SubscriptionId,
        id: Uuid,
        change_set: Record,
    },
    /// A record left a subscription's result set
    DidDelete {
        subscription_id: SubscriptionId,
        id: Uuid,
    },
    /// Reply to `CreateRecordMessage`
    DidCreateRecord {
        request_id: RequestId,
        record: Record,
    },
    /// Any message this client does not handle
    #[serde(other)]
    Unknown,
}

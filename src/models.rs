//! Record Models
//!
//! Typed views over the records the platform stores. The client never owns
//! the schema; fields are read by convention (snake_case on the wire).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};

/// An untyped record as it travels over the wire
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A typed model backed by a platform table
pub trait Table: DeserializeOwned {
    /// Table name on the platform
    const NAME: &'static str;

    /// Decode one record
    fn from_record(record: &Record) -> BackendResult<Self> {
        serde_json::from_value(serde_json::Value::Object(record.clone()))
            .map_err(|e| BackendError::InvalidRecord(format!("{}: {}", Self::NAME, e)))
    }

    /// Decode a result set, preserving order
    fn from_records(records: &[Record]) -> BackendResult<Vec<Self>> {
        records.iter().map(Self::from_record).collect()
    }
}

/// A published post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Table for Post {
    const NAME: &'static str = "posts";
}

/// One like on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Table for Like {
    const NAME: &'static str = "likes";
}

/// The logged in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

impl Table for User {
    const NAME: &'static str = "users";
}

/// Payload for publishing a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub body: String,
}

/// Payload for liking a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLike {
    pub post_id: Uuid,
}

/// An insert payload for a table
pub trait Insert: Serialize {
    const TABLE: &'static str;

    /// Convert to the record map sent with `CreateRecordMessage`
    fn into_record(&self) -> BackendResult<Record> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(BackendError::InvalidRecord(format!(
                "{} payload is not an object: {}",
                Self::TABLE,
                other
            ))),
        }
    }
}

impl Insert for NewPost {
    const TABLE: &'static str = Post::NAME;
}

impl Insert for NewLike {
    const TABLE: &'static str = Like::NAME;
}

/// Read the `id` field of a record
pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

//! State Management
//!
//! Session storage and the DataSync connection.

pub mod datasync;
pub mod session;

pub use datasync::{provide_datasync, use_query, DataSync};

/// Platform host serving login and DataSync
pub const BACKEND_HOST: &str = "https://twitter-clone-app.thinbackend.app";

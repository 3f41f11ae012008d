//! Client error types
//!
//! Defines all errors that can occur while talking to the backend platform.

use thiserror::Error;

/// Errors that can occur in the backend client
#[derive(Error, Debug)]
pub enum BackendError {
    /// I/O operation failed (session file, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// WebSocket transport failed
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// HTTP request to the platform failed
    #[cfg(feature = "native")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform rejected a request (`DataSyncError`)
    #[error("Server error: {0}")]
    Server(String),

    /// The connection went away before a reply arrived
    #[error("Disconnected from backend")]
    Disconnected,

    /// A realtime subscription stopped delivering results
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// No session is available
    #[error("Not logged in")]
    NotLoggedIn,

    /// A record is missing fields or has the wrong shape
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The login callback URL did not carry a usable session
    #[error("Invalid login callback: {0}")]
    InvalidCallback(String),
}

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::Server("table posts does not exist".to_string());
        assert_eq!(err.to_string(), "Server error: table posts does not exist");

        let err = BackendError::NotLoggedIn;
        assert_eq!(err.to_string(), "Not logged in");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BackendError = json_err.into();
        assert!(matches!(err, BackendError::Serialization(_)));
    }
}

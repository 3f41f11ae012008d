//! Sessions
//!
//! Login is delegated to the platform: the client sends the viewer to the
//! platform's login page and gets a user id and access token back as query
//! parameters on the redirect. The token then authenticates the DataSync
//! websocket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
}

/// Platform page that logs the viewer in, then redirects to `redirect_back`
pub fn login_url(host: &str, redirect_back: &str) -> String {
    format!(
        "{}/NewSession?redirectBack={}",
        host.trim_end_matches('/'),
        urlencoding::encode(redirect_back)
    )
}

/// Platform page that ends the session
pub fn logout_url(host: &str) -> String {
    format!("{}/DeleteSession", host.trim_end_matches('/'))
}

/// WebSocket URL of the DataSync endpoint for a session
pub fn datasync_url(host: &str, session: &Session) -> String {
    let host = host.trim_end_matches('/');
    let ws_host = if let Some(rest) = host.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = host.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        host.to_string()
    };
    format!(
        "{}/DataSyncController?access_token={}",
        ws_host,
        urlencoding::encode(&session.access_token)
    )
}

/// Extract a session from the query string of the login redirect
///
/// Returns `Ok(None)` when the query string carries no login parameters at
/// all, and an error when it carries only some of them or they are invalid.
pub fn session_from_callback(query_string: &str) -> BackendResult<Option<Session>> {
    let mut user_id = None;
    let mut access_token = None;

    for pair in query_string.trim_start_matches('?').split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map_err(|e| BackendError::InvalidCallback(e.to_string()))?
            .into_owned();
        match key {
            "userId" => user_id = Some(value),
            "accessToken" => access_token = Some(value),
            _ => {}
        }
    }

    match (user_id, access_token) {
        (None, None) => Ok(None),
        (Some(user_id), Some(access_token)) if !access_token.is_empty() => {
            let user_id = Uuid::parse_str(&user_id)
                .map_err(|e| BackendError::InvalidCallback(format!("userId: {}", e)))?;
            Ok(Some(Session {
                user_id,
                access_token,
            }))
        }
        _ => Err(BackendError::InvalidCallback(
            "expected both userId and accessToken".to_string(),
        )),
    }
}

/// Remove the login parameters from a query string, keeping the rest
pub fn strip_callback_params(query_string: &str) -> String {
    let kept: Vec<&str> = query_string
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !pair.is_empty() && key != "userId" && key != "accessToken"
        })
        .collect();
    if kept.is_empty() {
        String::new()
    } else {
        format!("?{}", kept.join("&"))
    }
}

#[cfg(feature = "native")]
pub use native::{AuthClient, SessionStore};

#[cfg(feature = "native")]
mod native {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use reqwest::Client;

    use super::{logout_url, Session};
    use crate::error::{BackendError, BackendResult};

    /// Session persisted as JSON on disk
    #[derive(Debug, Clone)]
    pub struct SessionStore {
        path: PathBuf,
    }

    impl SessionStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// The stored session, if any
        pub fn load(&self) -> BackendResult<Option<Session>> {
            match std::fs::read_to_string(&self.path) {
                Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        /// The stored session, or `NotLoggedIn`
        pub fn require(&self) -> BackendResult<Session> {
            self.load()?.ok_or(BackendError::NotLoggedIn)
        }

        pub fn save(&self, session: &Session) -> BackendResult<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
            tracing::debug!(path = ?self.path, "Session saved");
            Ok(())
        }

        /// Forget the session; missing files are fine
        pub fn clear(&self) -> BackendResult<()> {
            match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }

    /// HTTP calls to the platform's session endpoints
    pub struct AuthClient {
        client: Client,
        host: String,
    }

    impl AuthClient {
        pub fn new(host: &str, request_timeout: Duration) -> BackendResult<Self> {
            let client = Client::builder().timeout(request_timeout).build()?;
            Ok(Self {
                client,
                host: host.trim_end_matches('/').to_string(),
            })
        }

        /// Tell the platform the session is over
        pub async fn logout(&self, session: &Session) -> BackendResult<()> {
            let response = self
                .client
                .post(logout_url(&self.host))
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            if response.status().is_success() || response.status().is_redirection() {
                Ok(())
            } else {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                Err(BackendError::Server(format!("logout failed ({}): {}", status, text)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: Uuid::parse_str("5e3f2c4a-0d5e-4a43-9a7b-0a6a1f7d1c11").unwrap(),
            access_token: "abc.def+ghi".to_string(),
        }
    }

    #[test]
    fn test_login_url_encodes_redirect() {
        assert_eq!(
            login_url("https://app.thinbackend.app/", "http://localhost:3000/?a=b"),
            "https://app.thinbackend.app/NewSession?redirectBack=http%3A%2F%2Flocalhost%3A3000%2F%3Fa%3Db"
        );
    }

    #[test]
    fn test_datasync_url() {
        assert_eq!(
            datasync_url("https://app.thinbackend.app", &session()),
            "wss://app.thinbackend.app/DataSyncController?access_token=abc.def%2Bghi"
        );
        assert!(datasync_url("http://localhost:8000", &session()).starts_with("ws://localhost:8000/"));
    }

    #[test]
    fn test_session_from_callback() {
        let query = "?userId=5e3f2c4a-0d5e-4a43-9a7b-0a6a1f7d1c11&accessToken=abc.def%2Bghi&tab=1";
        assert_eq!(session_from_callback(query).unwrap(), Some(session()));
    }

    #[test]
    fn test_session_from_callback_without_params() {
        assert_eq!(session_from_callback("").unwrap(), None);
        assert_eq!(session_from_callback("?tab=1").unwrap(), None);
    }

    #[test]
    fn test_session_from_callback_partial() {
        let err = session_from_callback("?accessToken=x").unwrap_err();
        assert!(matches!(err, BackendError::InvalidCallback(_)));

        let err = session_from_callback("?userId=nope&accessToken=x").unwrap_err();
        assert!(matches!(err, BackendError::InvalidCallback(msg) if msg.starts_with("userId")));
    }

    #[test]
    fn test_strip_callback_params() {
        assert_eq!(strip_callback_params("?userId=1&accessToken=2&tab=1"), "?tab=1");
        assert_eq!(strip_callback_params("?userId=1&accessToken=2"), "");
        assert_eq!(strip_callback_params(""), "");
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_session_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(store.require(), Err(BackendError::NotLoggedIn)));

        store.save(&session()).unwrap();
        assert_eq!(store.require().unwrap(), session());

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}

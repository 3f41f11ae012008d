//! Hosted platform backend over DataSync

use async_trait::async_trait;

use super::{Backend, Subscription};
use crate::auth::{datasync_url, AuthClient, Session, SessionStore};
use crate::config::Config;
use crate::datasync::DataSyncClient;
use crate::error::BackendResult;
use crate::models::{Record, Table, User};
use crate::query::{query, Query};

/// [`Backend`] talking to the hosted platform
pub struct RemoteBackend {
    client: DataSyncClient,
    session: Session,
    auth: AuthClient,
    store: Option<SessionStore>,
}

impl RemoteBackend {
    /// Open a DataSync connection for `session`
    pub async fn connect(host: &str, session: Session, auth: AuthClient) -> BackendResult<Self> {
        let client = DataSyncClient::connect(&datasync_url(host, &session)).await?;
        Ok(Self {
            client,
            session,
            auth,
            store: None,
        })
    }

    /// Connect with the session saved in the configured session file
    pub async fn from_config(config: &Config) -> BackendResult<Self> {
        let store = SessionStore::new(&config.session.file);
        let session = store.require()?;
        let auth = AuthClient::new(&config.backend.host, config.backend.request_timeout())?;
        let backend = Self::connect(&config.backend.host, session, auth).await?;
        Ok(backend.with_store(store))
    }

    /// Clear `store` on logout
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn current_user(&self) -> BackendResult<Option<User>> {
        let users = self
            .client
            .query(
                query(User::NAME)
                    .filter_where("id", self.session.user_id)
                    .limit(1)
                    .build(),
            )
            .await?;
        users.first().map(User::from_record).transpose()
    }

    async fn subscribe(&self, query: Query) -> BackendResult<Subscription> {
        let (handle, state) = self.client.subscribe(query)?;
        Ok(Subscription::new(state).with_on_drop(self.client.unsubscriber(handle)))
    }

    async fn query(&self, query: Query) -> BackendResult<Vec<Record>> {
        self.client.query(query).await
    }

    async fn create_record(&self, table: &str, record: Record) -> BackendResult<Record> {
        self.client.create_record(table, record).await
    }

    async fn logout(&self) -> BackendResult<()> {
        if let Err(e) = self.auth.logout(&self.session).await {
            tracing::warn!(error = %e, "Platform logout failed, forgetting session locally");
        }
        if let Some(store) = &self.store {
            store.clear()?;
        }
        self.client.close();
        Ok(())
    }
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("user_id", &self.session.user_id)
            .field("connected", &self.client.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[tokio::test]
    async fn test_from_config_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.session.file = dir.path().join("session.json");

        let result = RemoteBackend::from_config(&config).await;
        assert!(matches!(result, Err(BackendError::NotLoggedIn)));
    }
}

//! Reactive session views
//!
//! Wraps the session controller in the query system so screens observe
//! session changes through the same mechanism as any other server
//! state. Session data is always fresh (manual invalidation only);
//! auth mutations invalidate the `session` scope when they land.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use api_client::session::SessionController;
use api_client::types::User;

use crate::query::{Query, QueryClient, QueryConfig, QueryKey};

/// Session-related errors
#[derive(Debug, thiserror::Error)]
pub enum SessionStateError {
    /// Controller-level auth error
    #[error("Auth error: {0}")]
    Auth(#[from] api_client::session::AuthError),

    /// Query error
    #[error("Query error: {0}")]
    Query(#[from] crate::query::QueryError),
}

/// Result type for session state operations
pub type Result<T> = std::result::Result<T, SessionStateError>;

/// The signed-in session as screens consume it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentSession {
    /// The signed-in user
    pub user: User,
    /// Whether the session is authenticated
    pub is_authenticated: bool,
}

/// Query for the current session
///
/// Returns `None` while no user record exists. Configured for manual
/// invalidation so a stale cached session can never outlive a logout.
#[derive(Clone)]
pub struct CurrentSessionQuery {
    controller: Arc<SessionController>,
}

impl CurrentSessionQuery {
    /// Create a new current session query
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Query for CurrentSessionQuery {
    type Data = Option<CurrentSession>;

    async fn fetch(&self) -> crate::query::Result<Self::Data> {
        let state = self.controller.state().await;

        Ok(state.user.map(|user| CurrentSession {
            user,
            is_authenticated: state.is_authenticated,
        }))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("session", "current")
    }

    fn config(&self) -> QueryConfig {
        QueryConfig::manual()
    }
}

/// High-level reactive handle over the session
#[derive(Clone)]
pub struct SessionHandle {
    controller: Arc<SessionController>,
    query_client: QueryClient,
}

impl SessionHandle {
    /// Create a new session handle
    pub fn new(controller: Arc<SessionController>, query_client: QueryClient) -> Self {
        Self { controller, query_client }
    }

    /// The underlying controller, for invoking auth operations
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Get the current session through the query cache
    pub async fn current_session(&self) -> Result<Option<CurrentSession>> {
        let query = CurrentSessionQuery::new(Arc::clone(&self.controller));
        Ok(self.query_client.get(&query).await?)
    }

    /// Invalidate session queries after an auth mutation lands
    pub async fn invalidate(&self) -> Result<()> {
        self.query_client.invalidate_scope("session").await?;
        Ok(())
    }

    /// Invalidate everything derived from the signed-in user
    ///
    /// Called on logout so per-user reads (profile, notifications,
    /// enrolled courses) refetch under the next account.
    pub async fn invalidate_user_data(&self) -> Result<()> {
        for scope in ["session", "account", "courses", "notifications", "quizzes"] {
            self.query_client.invalidate_scope(scope).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::auth_api::AuthApi;
    use api_client::http::{ApiClient, ApiClientConfig, TokenStore};
    use api_client::session::{session_snapshot_store, KvTokenStore};
    use storage::kv::KvStore;
    use storage::CacheConfig;
    use tempfile::TempDir;

    async fn signed_out_handle() -> (SessionHandle, TempDir) {
        let dir = TempDir::new().unwrap();

        let kv = Arc::new(KvStore::in_memory().unwrap());
        let tokens: Arc<dyn TokenStore> = Arc::new(KvTokenStore::new(kv));
        let snapshot = Arc::new(session_snapshot_store(dir.path()));

        let client = Arc::new(ApiClient::new(ApiClientConfig::new("http://127.0.0.1:9")));
        let controller = Arc::new(SessionController::new(
            AuthApi::new(client),
            tokens,
            snapshot,
        ));
        controller.hydrate().await.unwrap();

        let query_client = QueryClient::new(CacheConfig::default()).unwrap();
        (SessionHandle::new(controller, query_client), dir)
    }

    #[tokio::test]
    async fn test_current_session_none_when_signed_out() {
        let (handle, _dir) = signed_out_handle().await;
        let session = handle.current_session().await.unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_is_safe_with_empty_cache() {
        let (handle, _dir) = signed_out_handle().await;
        handle.invalidate().await.unwrap();
        handle.invalidate_user_data().await.unwrap();
    }

    #[tokio::test]
    async fn test_current_session_reflects_cleared_state_after_invalidate() {
        let (handle, _dir) = signed_out_handle().await;

        assert!(handle.current_session().await.unwrap().is_none());

        handle.controller().logout().await.unwrap();
        handle.invalidate().await.unwrap();

        assert!(handle.current_session().await.unwrap().is_none());
    }
}

//! Session state and credential persistence
//!
//! The session is created empty at process start, hydrated from the
//! persisted snapshot if one exists, and mutated only through the
//! [`SessionController`]. Two things persist across restarts:
//!
//! - the raw bearer token, under the `auth_token` key in the KV store
//! - the [`SessionSnapshot`] (`user` + `isAuthenticated`, written
//!   together as one unit) in the `auth-storage` snapshot file
//!
//! `is_loading` and `error` are transient and never persisted.

mod controller;

pub use controller::SessionController;

use crate::http::{ApiError, TokenStore};
use crate::oauth::IdentityError;
use crate::types::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::kv::{KvError, KvStore};
use storage::snapshot::{SnapshotConfig, SnapshotError, SnapshotStore};
use thiserror::Error;

/// KV key holding the raw bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// File stem of the persisted session snapshot
pub const SESSION_SNAPSHOT_NAME: &str = "auth-storage";

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request or backend failure
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Credential store failure
    #[error("Token storage error: {0}")]
    Token(#[from] KvError),

    /// Session snapshot failure
    #[error("Session storage error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Identity provider failure
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl AuthError {
    /// The message recorded into session state for this failure
    ///
    /// Server-reported errors surface their own message; everything
    /// else (transport, storage) falls back to the operation's generic
    /// message, which is what the original screens display.
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Api(e) => e
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
            _ => fallback.to_string(),
        }
    }
}

/// In-memory session state observed by screens
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Present only after signup/login/verify succeeded
    pub user: Option<User>,
    /// True only after a successful login/verify/Google exchange
    pub is_authenticated: bool,
    /// True while an auth request is in flight
    pub is_loading: bool,
    /// Message from the most recent failed operation
    pub error: Option<String>,
}

/// The persisted subset of session state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Signed-in (or signing-up) user
    pub user: Option<User>,
    /// Whether the session was authenticated
    pub is_authenticated: bool,
}

/// Token store over the KV database at the `auth_token` key
pub struct KvTokenStore {
    kv: Arc<KvStore>,
}

impl KvTokenStore {
    /// Create a token store over a shared KV database
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }
}

impl TokenStore for KvTokenStore {
    fn get(&self) -> Result<Option<String>, KvError> {
        self.kv.get(AUTH_TOKEN_KEY)
    }

    fn put(&self, token: &str) -> Result<(), KvError> {
        self.kv.set(AUTH_TOKEN_KEY, &token.to_string())
    }

    fn clear(&self) -> Result<bool, KvError> {
        self.kv.remove(AUTH_TOKEN_KEY)
    }
}

/// Build the snapshot store for the session at the given data directory
pub fn session_snapshot_store(
    data_dir: impl Into<std::path::PathBuf>,
) -> SnapshotStore<SessionSnapshot> {
    let path = data_dir.into().join(format!("{SESSION_SNAPSHOT_NAME}.json"));
    SnapshotStore::new(SnapshotConfig::new(path).version(1))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_wire_shape() {
        let snapshot = SessionSnapshot {
            user: Some(User {
                id: "u_1".to_string(),
                full_name: "Amina".to_string(),
                email: "a@b.com".to_string(),
                phone: None,
                role: crate::types::Role::User,
                is_verified: true,
            }),
            is_authenticated: true,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"isAuthenticated\":true"));

        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_kv_token_store_round_trip() {
        let kv = Arc::new(KvStore::in_memory().unwrap());
        let store = KvTokenStore::new(kv);

        assert_eq!(store.get().unwrap(), None);

        store.put("tok_1").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok_1".to_string()));

        assert!(store.clear().unwrap());
        assert_eq!(store.get().unwrap(), None);
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_display_message_prefers_server_message() {
        let err = AuthError::Api(ApiError::new(400, "BadRequest", "Email already registered"));
        assert_eq!(err.display_message("Failed to sign up"), "Email already registered");
    }

    #[test]
    fn test_display_message_falls_back_on_transport() {
        let err = AuthError::Api(ApiError::new(0, "NetworkError", "connection refused"));
        assert_eq!(err.display_message("Failed to log in"), "Failed to log in");
    }

    #[test]
    fn test_display_message_falls_back_on_storage() {
        let err = AuthError::Snapshot(SnapshotError::NotLoaded);
        assert_eq!(err.display_message("Failed to log in"), "Failed to log in");
    }
}

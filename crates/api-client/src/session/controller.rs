//! Session controller
//!
//! The single writer of session state. Every screen-facing auth
//! operation lives here: signup, login, email verification, Google
//! token exchange, logout. Each method flips `is_loading` on entry and
//! guarantees it is false again on every exit path; failures record a
//! display message into `error` and return the typed error so the
//! calling screen can raise a toast.
//!
//! Concurrency: methods take `&self` and transition state through
//! atomic writes between await points. Overlapping calls are not
//! serialized; the last writer wins. In-flight requests are not
//! cancelled when the caller goes away.

use std::sync::Arc;

use crate::auth_api::{
    AuthApi, Credentials, GoogleLoginRequest, GoogleUserInfo, SignupData, SignupReceipt,
    VerifyData,
};
use crate::http::TokenStore;
use crate::oauth::IdentityProfile;
use crate::session::{AuthError, SessionSnapshot, SessionState};
use crate::types::User;
use storage::snapshot::SnapshotStore;
use tokio::sync::RwLock;

const SIGNUP_FALLBACK: &str = "Failed to sign up";
const LOGIN_FALLBACK: &str = "Failed to log in";
const VERIFY_FALLBACK: &str = "Failed to verify account";
const GOOGLE_FALLBACK: &str = "Failed to authenticate with Google";

/// Session/auth controller
///
/// An explicit context object: the HTTP endpoints, the credential
/// store, and the snapshot store are all injected, so there is no
/// ambient global state anywhere in the auth path.
pub struct SessionController {
    auth: AuthApi,
    state: Arc<RwLock<SessionState>>,
    tokens: Arc<dyn TokenStore>,
    snapshot: Arc<SnapshotStore<SessionSnapshot>>,
}

impl SessionController {
    /// Create a new controller over its injected ports
    pub fn new(
        auth: AuthApi,
        tokens: Arc<dyn TokenStore>,
        snapshot: Arc<SnapshotStore<SessionSnapshot>>,
    ) -> Self {
        Self {
            auth,
            state: Arc::new(RwLock::new(SessionState::default())),
            tokens,
            snapshot,
        }
    }

    /// Hydrate session state from the persisted snapshot
    ///
    /// Called once at process start. A missing snapshot file hydrates
    /// to the signed-out default.
    pub async fn hydrate(&self) -> Result<(), AuthError> {
        self.snapshot.load().await?;
        let persisted = self.snapshot.get().await?;

        self.set(|s| {
            s.user = persisted.user;
            s.is_authenticated = persisted.is_authenticated;
            s.is_loading = false;
            s.error = None;
        })
        .await;

        Ok(())
    }

    /// Get a copy of the current session state
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Register a new account
    ///
    /// On success a partial user record is stored (the server fields
    /// plus the submitted email) but the session stays unauthenticated;
    /// the returned receipt carries the `user_id` the verification step
    /// needs.
    pub async fn signup(&self, data: SignupData) -> Result<SignupReceipt, AuthError> {
        self.begin().await;

        match self.auth.register(&data).await {
            Ok(receipt) => {
                let user = User {
                    id: receipt.user_id.clone(),
                    full_name: receipt
                        .full_name
                        .clone()
                        .unwrap_or_else(|| data.full_name.clone()),
                    email: data.email.clone(),
                    phone: receipt.phone.clone().or(Some(data.phone.clone())),
                    role: receipt.role.unwrap_or(data.user_type),
                    is_verified: false,
                };

                self.set(|s| {
                    s.is_loading = false;
                    s.user = Some(user);
                })
                .await;
                self.persist_snapshot().await;

                tracing::debug!(user_id = %receipt.user_id, "signup accepted, verification pending");
                Ok(receipt)
            }
            Err(e) => Err(self.fail(e.into(), SIGNUP_FALLBACK).await),
        }
    }

    /// Log in with email and password
    ///
    /// The bearer token is persisted before the state flips to
    /// authenticated, so an authenticated session always has a stored
    /// token behind it.
    pub async fn login(&self, credentials: Credentials) -> Result<(), AuthError> {
        self.begin().await;

        match self.auth.login(&credentials).await {
            Ok(payload) => {
                if let Err(e) = self.tokens.put(&payload.token) {
                    tracing::error!(error = %e, "failed to persist auth token");
                    return Err(self.fail(e.into(), LOGIN_FALLBACK).await);
                }

                self.set(|s| {
                    s.user = Some(payload.user);
                    s.is_authenticated = true;
                    s.is_loading = false;
                })
                .await;
                self.persist_snapshot().await;

                Ok(())
            }
            Err(e) => Err(self.fail(e.into(), LOGIN_FALLBACK).await),
        }
    }

    /// Submit the email verification code
    ///
    /// The verification response carries no token, so nothing is
    /// written to the credential store even though the session flips to
    /// authenticated. A password login or Google sign-in is what stores
    /// a token; until then the next authorized request 401s, the HTTP
    /// layer clears the (absent) token, and the route guard routes back
    /// to login.
    pub async fn verify(&self, data: VerifyData) -> Result<(), AuthError> {
        self.begin().await;

        match self.auth.verify_email(&data).await {
            Ok(payload) => {
                self.set(|s| {
                    s.user = Some(payload.user);
                    s.is_authenticated = true;
                    s.is_loading = false;
                })
                .await;
                self.persist_snapshot().await;

                Ok(())
            }
            Err(e) => Err(self.fail(e.into(), VERIFY_FALLBACK).await),
        }
    }

    /// Exchange a provider ID token for a backend session
    pub async fn handle_google_token_auth(
        &self,
        id_token: String,
        profile: IdentityProfile,
    ) -> Result<(), AuthError> {
        self.begin().await;

        let request = GoogleLoginRequest {
            id_token,
            user_info: GoogleUserInfo::from(profile),
        };

        match self.auth.google_login(&request).await {
            Ok(payload) => {
                if let Err(e) = self.tokens.put(&payload.token) {
                    tracing::error!(error = %e, "failed to persist auth token");
                    return Err(self.fail(e.into(), GOOGLE_FALLBACK).await);
                }

                self.set(|s| {
                    s.user = Some(payload.user);
                    s.is_authenticated = true;
                    s.is_loading = false;
                })
                .await;
                self.persist_snapshot().await;

                Ok(())
            }
            Err(e) => Err(self.fail(e.into(), GOOGLE_FALLBACK).await),
        }
    }

    /// End the session client-side
    ///
    /// Best-effort: in-memory state is cleared first and stays cleared
    /// whatever happens to the stores, so the app always ends up logged
    /// out locally. Storage failures are logged and reported.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.set(|s| *s = SessionState::default()).await;

        let mut first_error: Option<AuthError> = None;

        if let Err(e) = self.tokens.clear() {
            tracing::error!(error = %e, "failed to remove auth token on logout");
            first_error.get_or_insert(e.into());
        }

        if let Err(e) = self.snapshot.clear().await {
            tracing::error!(error = %e, "failed to clear session snapshot on logout");
            first_error.get_or_insert(e.into());
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Reset the error message; a no-op when none is set
    pub async fn clear_error(&self) {
        self.set(|s| s.error = None).await;
    }

    async fn begin(&self) {
        self.set(|s| {
            s.is_loading = true;
            s.error = None;
        })
        .await;
    }

    /// Record a failure into state and hand the error back
    async fn fail(&self, error: AuthError, fallback: &str) -> AuthError {
        let message = error.display_message(fallback);
        self.set(|s| {
            s.is_loading = false;
            s.error = Some(message);
        })
        .await;
        error
    }

    /// One atomic state transition
    async fn set<F: FnOnce(&mut SessionState)>(&self, f: F) {
        let mut state = self.state.write().await;
        f(&mut state);
    }

    /// Mirror the persisted subset of state to the snapshot file
    ///
    /// Snapshot writes are best-effort; a failure here must not undo an
    /// already-established session, so it is logged and swallowed.
    async fn persist_snapshot(&self) {
        let snapshot = {
            let state = self.state.read().await;
            SessionSnapshot {
                user: state.user.clone(),
                is_authenticated: state.is_authenticated,
            }
        };

        if let Err(e) = self.snapshot.set(snapshot).await {
            tracing::error!(error = %e, "failed to persist session snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ApiClient, ApiClientConfig};
    use crate::session::test_support::controller_with_client;

    fn offline_controller() -> Arc<SessionController> {
        let client = Arc::new(ApiClient::new(ApiClientConfig::new("http://127.0.0.1:9")));
        controller_with_client(client)
    }

    #[tokio::test]
    async fn test_initial_state_is_signed_out() {
        let controller = offline_controller();
        let state = controller.state().await;

        assert_eq!(state, SessionState::default());
        assert!(state.user.is_none());
        assert!(!state.is_authenticated);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_hydrate_without_snapshot_defaults() {
        let controller = offline_controller();
        controller.hydrate().await.unwrap();

        let state = controller.state().await;
        assert!(state.user.is_none());
        assert!(!state.is_authenticated);
    }

    #[tokio::test]
    async fn test_clear_error_is_idempotent() {
        let controller = offline_controller();
        controller.hydrate().await.unwrap();

        let before = controller.state().await;
        controller.clear_error().await;
        controller.clear_error().await;
        let after = controller.state().await;

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_logout_from_signed_out_state() {
        let controller = offline_controller();
        controller.hydrate().await.unwrap();

        controller.logout().await.unwrap();

        let state = controller.state().await;
        assert_eq!(state, SessionState::default());
    }

    #[tokio::test]
    async fn test_failed_login_records_error_and_resets_loading() {
        // Unroutable backend: the transport fails, the fallback message
        // lands in state
        let controller = offline_controller();
        controller.hydrate().await.unwrap();

        let result = controller
            .login(Credentials {
                email: "a@b.com".to_string(),
                password: "secret123".to_string(),
            })
            .await;

        assert!(result.is_err());
        let state = controller.state().await;
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Failed to log in"));
    }
}

//! Identity-provider bridge for Google sign-in
//!
//! The session controller never talks to a sign-in SDK directly. It
//! consumes an [`IdentityProvider`]: availability check, interactive
//! sign-in, token retrieval. SDK-specific error codes stop at
//! [`IdentityError`], which maps them to a small fixed set of
//! user-facing messages. Cancellation by the user is an informational
//! outcome, not an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::session::{AuthError, SessionController};

/// Errors surfaced by a sign-in provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The user dismissed the sign-in dialog
    #[error("Sign in was cancelled")]
    Cancelled,

    /// Another sign-in attempt is already running
    #[error("Sign in is already in progress")]
    InProgress,

    /// Provider services are missing on this device
    #[error("Google Play Services not available")]
    ServicesUnavailable,

    /// The provider wants a fresh interactive sign-in
    #[error("Sign in required")]
    SignInRequired,

    /// Sign-in completed but no ID token came back
    #[error("No ID token received")]
    MissingIdToken,

    /// Any other provider failure
    #[error("{0}")]
    Provider(String),
}

impl IdentityError {
    /// The fixed message screens display for this failure
    pub fn user_message(&self) -> &str {
        match self {
            IdentityError::Cancelled => "Sign in was cancelled",
            IdentityError::InProgress => "Sign in is already in progress",
            IdentityError::ServicesUnavailable => "Google Play Services not available",
            IdentityError::SignInRequired => "Sign in required",
            IdentityError::MissingIdToken => "No ID token received",
            IdentityError::Provider(_) => "Google authentication failed",
        }
    }
}

/// Profile fields a provider hands back after sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// Provider account id
    pub id: String,
    /// Provider account email
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Avatar URL
    pub photo: Option<String>,
}

/// Result of an interactive sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySignIn {
    /// ID token to exchange with the backend
    pub id_token: String,
    /// Provider profile
    pub profile: IdentityProfile,
}

/// Sign-in provider port
///
/// One concrete adapter per SDK; the rest of the app depends only on
/// this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check that the provider can run on this device
    async fn ensure_available(&self) -> Result<(), IdentityError>;

    /// Run the interactive sign-in and return the token + profile
    async fn sign_in(&self) -> Result<IdentitySignIn, IdentityError>;

    /// Sign out of the provider
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Google sign-in configuration
///
/// Client identifiers come from environment configuration; scopes are
/// fixed to OpenID Connect basics.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleSignInConfig {
    /// OAuth web client id
    pub web_client_id: String,
    /// OAuth iOS client id
    pub ios_client_id: Option<String>,
    /// Requested scopes
    pub scopes: Vec<String>,
}

impl GoogleSignInConfig {
    /// Environment variable holding the web client id
    pub const WEB_CLIENT_ID_VAR: &'static str = "PASSAGE_GOOGLE_WEB_CLIENT_ID";
    /// Environment variable holding the iOS client id
    pub const IOS_CLIENT_ID_VAR: &'static str = "PASSAGE_GOOGLE_IOS_CLIENT_ID";

    /// Create a configuration with the fixed scope set
    pub fn new(web_client_id: impl Into<String>) -> Self {
        Self {
            web_client_id: web_client_id.into(),
            ios_client_id: None,
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
        }
    }

    /// Set the iOS client id
    pub fn with_ios_client_id(mut self, ios_client_id: impl Into<String>) -> Self {
        self.ios_client_id = Some(ios_client_id.into());
        self
    }

    /// Read configuration from the environment
    ///
    /// Returns `None` when the web client id is not set; the Google
    /// button is hidden in that case.
    pub fn from_env() -> Option<Self> {
        let web_client_id = std::env::var(Self::WEB_CLIENT_ID_VAR).ok()?;
        let mut config = Self::new(web_client_id);
        if let Ok(ios_client_id) = std::env::var(Self::IOS_CLIENT_ID_VAR) {
            config = config.with_ios_client_id(ios_client_id);
        }
        Some(config)
    }
}

/// Outcome of a Google sign-in attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The backend session was established
    Completed,
    /// The user backed out; nothing changed
    Cancelled,
}

/// Orchestrates provider sign-in into a backend session
///
/// Runs the three-step sequence the provider requires (availability,
/// interactive sign-in, token retrieval) and hands the result to the
/// session controller for the token exchange.
pub struct GoogleAuthFlow<P> {
    provider: P,
    controller: Arc<SessionController>,
}

impl<P: IdentityProvider> GoogleAuthFlow<P> {
    /// Create a new flow
    pub fn new(provider: P, controller: Arc<SessionController>) -> Self {
        Self { provider, controller }
    }

    /// Run the sign-in sequence
    ///
    /// Cancellation at any step resolves to
    /// [`SignInOutcome::Cancelled`]; other provider failures and backend
    /// failures are errors for the caller to present.
    pub async fn sign_in(&self) -> Result<SignInOutcome, AuthError> {
        let attempt = async {
            self.provider.ensure_available().await?;
            self.provider.sign_in().await
        };

        let signed_in = match attempt.await {
            Ok(signed_in) => signed_in,
            Err(IdentityError::Cancelled) => {
                tracing::info!("google sign-in cancelled by user");
                return Ok(SignInOutcome::Cancelled);
            }
            Err(e) => return Err(e.into()),
        };

        self.controller
            .handle_google_token_auth(signed_in.id_token, signed_in.profile)
            .await?;

        Ok(SignInOutcome::Completed)
    }

    /// Sign out of the provider, logging failures
    pub async fn sign_out(&self) {
        if let Err(e) = self.provider.sign_out().await {
            tracing::error!(error = %e, "google sign-out failed");
        }
    }

    /// The session controller this flow feeds
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }
}

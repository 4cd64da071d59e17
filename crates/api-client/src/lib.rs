//! Passage API client
//!
//! This crate is the remote-facing core of the Passage mobile app: a
//! configured HTTP client for the Passage backend, typed auth endpoints,
//! the session controller that owns the signed-in state, and the
//! identity-provider port used for Google sign-in.
//!
//! The session controller is the only writer of session state. Screens
//! call its methods, observe the resulting [`session::SessionState`],
//! and leave presentation of errors (toasts, banners) to themselves.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth_api;
pub mod http;
pub mod oauth;
pub mod session;
pub mod types;

pub use auth_api::{AuthApi, Credentials, SignupData, VerifyData};
pub use http::{ApiClient, ApiClientConfig, ApiError, ApiRequest, ApiResponse, TokenStore};
pub use oauth::{GoogleAuthFlow, GoogleSignInConfig, IdentityProvider, SignInOutcome};
pub use session::{AuthError, KvTokenStore, SessionController, SessionSnapshot, SessionState};
pub use types::{Role, User};

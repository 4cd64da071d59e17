//! Typed auth endpoints
//!
//! Thin wrappers over [`ApiClient`] for the four authentication
//! procedures the backend exposes: register, login, email verification,
//! and Google token exchange. The session controller is the only
//! intended caller; it owns what happens to the returned payloads.

use crate::http::{ApiClient, ApiError, ApiRequest};
use crate::oauth::IdentityProfile;
use crate::types::{DataEnvelope, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Role;

/// Registration payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    /// Full display name
    pub full_name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Password
    pub password: String,
    /// Requested account role
    pub user_type: Role,
}

/// Login payload
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Email verification payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyData {
    /// Identifier returned by signup
    pub user_id: String,
    /// 6-digit code from the verification email
    pub verification_code: String,
}

/// Google token exchange payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    /// ID token from the identity provider
    pub id_token: String,
    /// Profile fields from the provider
    pub user_info: GoogleUserInfo,
}

/// Provider profile fields forwarded to the backend
#[derive(Debug, Clone, Serialize)]
pub struct GoogleUserInfo {
    /// Provider account email
    pub email: String,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Provider account id
    pub id: String,
}

impl From<IdentityProfile> for GoogleUserInfo {
    fn from(profile: IdentityProfile) -> Self {
        Self {
            email: profile.email,
            name: profile.name,
            photo: profile.photo,
            id: profile.id,
        }
    }
}

/// Partial record returned by signup; verification is still pending
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupReceipt {
    /// Server-issued identifier, needed for the verify step
    pub user_id: String,
    /// Full name, when the server echoes it back
    #[serde(default)]
    pub full_name: Option<String>,
    /// Phone number, when the server echoes it back
    #[serde(default)]
    pub phone: Option<String>,
    /// Granted role
    #[serde(default)]
    pub role: Option<Role>,
}

/// Successful login / Google exchange body: the user plus a bearer token
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    /// The authenticated user
    pub user: User,
    /// Bearer token for subsequent requests
    pub token: String,
}

/// Successful email verification body
///
/// Note: unlike [`AuthPayload`], no token comes back on this path.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedPayload {
    /// The now-verified user
    pub user: User,
}

/// Typed client for the `/auth/*` endpoints
#[derive(Clone)]
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    /// Create a new auth API over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `POST /auth/register`
    pub async fn register(&self, data: &SignupData) -> Result<SignupReceipt, ApiError> {
        let request = ApiRequest::post("/auth/register")
            .json_body(data)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: crate::http::ApiResponse<DataEnvelope<SignupReceipt>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// `POST /auth/login`
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
        let request = ApiRequest::post("/auth/login")
            .json_body(credentials)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: crate::http::ApiResponse<DataEnvelope<AuthPayload>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// `POST /auth/verify-email`
    pub async fn verify_email(&self, data: &VerifyData) -> Result<VerifiedPayload, ApiError> {
        let request = ApiRequest::post("/auth/verify-email")
            .json_body(data)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: crate::http::ApiResponse<DataEnvelope<VerifiedPayload>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// `POST /auth/google-login`
    pub async fn google_login(&self, data: &GoogleLoginRequest) -> Result<AuthPayload, ApiError> {
        let request = ApiRequest::post("/auth/google-login")
            .json_body(data)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: crate::http::ApiResponse<DataEnvelope<AuthPayload>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// The underlying shared client
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

//! Shared wire types for the Passage backend
//!
//! The backend speaks camelCase JSON and wraps payloads in one of two
//! envelopes: `{ "data": ... }` for single objects and
//! `{ "results": [...] }` for lists.

use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Student / regular user
    #[default]
    User,
    /// Tutor account
    Tutor,
}

/// A signed-in (or signing-up) user
///
/// Signup returns only a partial record; `phone` stays absent and
/// `is_verified` false until the email verification step completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-issued identifier
    #[serde(alias = "userId")]
    pub id: String,

    /// Full display name
    #[serde(default)]
    pub full_name: String,

    /// Email address
    pub email: String,

    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Account role
    #[serde(default)]
    pub role: Role,

    /// Whether the email has been verified
    #[serde(default)]
    pub is_verified: bool,
}

/// `{ "data": T }` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    /// Wrapped payload
    pub data: T,
}

/// `{ "results": [T] }` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsEnvelope<T> {
    /// Wrapped list payload
    pub results: Vec<T>,
}

/// Acknowledgement body for write operations
#[derive(Debug, Clone, Deserialize)]
pub struct Acknowledgement {
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: bool,
    /// Optional server message
    #[serde(default)]
    pub message: Option<String>,
}

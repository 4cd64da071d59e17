//! Form validation
//!
//! Local precondition checks for the auth forms. Failures here never
//! reach the network layer; screens render them as inline field
//! messages.

use api_client::auth_api::{Credentials, SignupData};
use regex::Regex;
use std::sync::OnceLock;

/// A field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Which field failed
    pub field: &'static str,
    /// Inline message to display
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Validate a signup form; empty result means the form can submit
pub fn validate_signup(data: &SignupData) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if data.full_name.trim().chars().count() < 3 {
        errors.push(FieldError::new(
            "fullName",
            "Full name must be at least 3 characters",
        ));
    }

    if !is_valid_email(&data.email) {
        errors.push(FieldError::new("email", "Please enter a valid email address"));
    }

    if data.phone.chars().filter(|c| c.is_ascii_digit()).count() < 10 {
        errors.push(FieldError::new(
            "phone",
            "Phone number must be at least 10 digits",
        ));
    }

    if data.password.chars().count() < 8 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    } else {
        if !data.password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(FieldError::new(
                "password",
                "Password must contain at least one uppercase letter",
            ));
        }
        if !data.password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(FieldError::new(
                "password",
                "Password must contain at least one lowercase letter",
            ));
        }
        if !data.password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(FieldError::new(
                "password",
                "Password must contain at least one number",
            ));
        }
    }

    errors
}

/// Validate a login form
pub fn validate_login(credentials: &Credentials) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !is_valid_email(&credentials.email) {
        errors.push(FieldError::new("email", "Please enter a valid email address"));
    }

    if credentials.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    errors
}

/// Validate a verification code: exactly 6 digits
pub fn validate_verification_code(code: &str) -> Option<FieldError> {
    if code.chars().count() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(FieldError::new("code", "Verification code must be 6 digits"))
    }
}

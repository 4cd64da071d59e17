//! HTTP client for the Passage backend
//!
//! This module implements the single configured request client the rest
//! of the app talks through. It owns the request/response plumbing:
//! building URLs against the fixed backend host, attaching the bearer
//! token from the credential store on every request, parsing the
//! backend's JSON envelopes, and clearing the persisted token when the
//! backend answers 401.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use storage::kv::KvError;

// =============================================================================
// Error Types
// =============================================================================

/// API error with HTTP status and message
///
/// Represents both transport failures (status 0) and server-reported
/// errors. Server errors carry the `message` field from the backend's
/// error body, which is what screens display.
///
/// # Examples
/// ```
/// use api_client::http::ApiError;
///
/// let error = ApiError::new(404, "NotFound", "Course not found");
/// assert_eq!(error.status(), 404);
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code (0 for transport failures)
    status: u16,
    /// Error code (e.g., "Unauthorized", "NetworkError")
    code: String,
    /// Human-readable error message
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a network-related error that may be retried
    ///
    /// Transport failures and transient gateway statuses count; plain
    /// client errors (400, 401, 404, ...) do not.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.status,
            0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524
        )
    }

    /// Check if the backend rejected the request as unauthorized
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// The server-supplied display message, if the error came from the
    /// backend rather than the transport
    pub fn server_message(&self) -> Option<&str> {
        if self.status > 0 && !self.message.is_empty() {
            Some(&self.message)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error {}: {} - {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error body shape the backend returns alongside non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Short human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Longer detail string
    #[serde(default)]
    pub detail: Option<String>,
}

// =============================================================================
// Token Store Port
// =============================================================================

/// Credential store the client reads the bearer token from
///
/// The concrete implementation persists the raw token string under the
/// `auth_token` key; the client only sees this port. A failing read is
/// treated as "no token" so requests still go out unauthenticated.
pub trait TokenStore: Send + Sync {
    /// Get the persisted bearer token, if any
    fn get(&self) -> Result<Option<String>, KvError>;

    /// Persist a bearer token
    fn put(&self, token: &str) -> Result<(), KvError>;

    /// Remove the persisted bearer token, returning whether one existed
    fn clear(&self) -> Result<bool, KvError>;
}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Method name as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One part of a multipart upload
///
/// Parts carry their bytes so requests stay cloneable for retry; the
/// reqwest form is assembled at send time.
#[derive(Debug, Clone)]
pub struct MultipartFile {
    /// Form field name (e.g., "file" or "files")
    pub field: String,
    /// Original file name
    pub file_name: String,
    /// MIME type
    pub mime_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// JSON-encoded body
    Json(Vec<u8>),
    /// Multipart form with file parts
    Multipart(Vec<MultipartFile>),
}

/// An API request: method, path, params, headers, and optional body
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path under the base URL (e.g., "/auth/login")
    pub path: String,
    /// Query parameters
    pub params: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Create a PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Create a DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set a JSON body
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(RequestBody::Json(serde_json::to_vec(value)?));
        Ok(self)
    }

    /// Set a multipart body
    pub fn multipart(mut self, files: Vec<MultipartFile>) -> Self {
        self.body = Some(RequestBody::Multipart(files));
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from an API endpoint with headers and parsed data
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Parsed response data
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a new response
    pub fn new(status: u16, headers: HashMap<String, String>, data: T) -> Self {
        Self { status, headers, data }
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers.get(key)
    }

    /// Check if the response is successful (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the backend, including the API prefix
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.passageapp.com/api/v1".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Passage/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Retry Logic with Exponential Backoff
// =============================================================================

use std::future::Future;
use tokio::time::sleep;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries, ..Default::default() }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn calculate_delay(&self, attempt: usize) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);

        let delay = Duration::from_millis(delay_ms as u64);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Retry an async operation with a configurable retry policy
pub async fn retry<F, Fut, T, E>(
    config: RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;

                if !should_retry(&err) || attempts > config.max_retries {
                    return Err(err);
                }

                let delay = config.calculate_delay(attempts - 1);
                sleep(delay).await;
            }
        }
    }
}

/// Retry an operation on network errors only
pub async fn network_retry<F, Fut, T>(max_retries: usize, operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let config = RetryConfig::new(max_retries);
    retry(config, |err: &ApiError| err.is_network_error(), operation).await
}

// =============================================================================
// API Client
// =============================================================================

use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};

/// The configured request client for the Passage backend
///
/// One instance is shared by every service in the app. When a
/// [`TokenStore`] is attached, the client attaches
/// `Authorization: Bearer <token>` to each request and removes the
/// persisted token when a response comes back 401. It does not touch
/// in-memory session state on 401; the route guard reconciles that on
/// the next navigation.
#[derive(Clone)]
pub struct ApiClient {
    client: ReqwestClient,
    config: ApiClientConfig,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl ApiClient {
    /// Create a new API client without a credential store
    pub fn new(config: ApiClientConfig) -> Self {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config, token_store: None }
    }

    /// Create a new API client backed by a credential store
    pub fn with_token_store(config: ApiClientConfig, token_store: Arc<dyn TokenStore>) -> Self {
        let mut client = Self::new(config);
        client.token_store = Some(token_store);
        client
    }

    /// Send a request and parse the JSON response into `T`
    pub async fn send<T>(&self, request: ApiRequest) -> Result<ApiResponse<T>, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        // Build URL
        let url = format!("{}{}", self.config.base_url, request.path);

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in &request.params {
            req = req.query(&[(key, value)]);
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        // Attach the bearer token when one is persisted; a failing read
        // degrades to an unauthenticated request
        if let Some(store) = &self.token_store {
            match store.get() {
                Ok(Some(token)) => {
                    req = req.header("Authorization", format!("Bearer {token}"));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read auth token, sending without it");
                }
            }
        }

        match request.body {
            Some(RequestBody::Json(bytes)) => {
                req = req.header("Content-Type", "application/json").body(bytes);
            }
            Some(RequestBody::Multipart(files)) => {
                let mut form = reqwest::multipart::Form::new();
                for file in files {
                    let part = reqwest::multipart::Part::bytes(file.bytes)
                        .file_name(file.file_name)
                        .mime_str(&file.mime_type)
                        .map_err(|e| {
                            ApiError::new(0, "InvalidMimeType", e.to_string())
                        })?;
                    form = form.part(file.field, part);
                }
                req = req.multipart(form);
            }
            None => {}
        }

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::new(0, "NetworkError", format!("Request failed: {e}")))?;

        self.parse_response(response).await
    }

    /// Send a request, retrying transport and transient-gateway failures
    pub async fn send_with_retry<T>(
        &self,
        request: ApiRequest,
        max_retries: usize,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        network_retry(max_retries, || self.send(request.clone())).await
    }

    async fn parse_response<T>(&self, response: ReqwestResponse) -> Result<ApiResponse<T>, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let status_code = status.as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.to_string(), value_str.to_string());
            }
        }

        if !status.is_success() {
            // An expired or invalid token comes back as 401; drop the
            // persisted token so the next guarded navigation falls back
            // to the auth flow
            if status_code == 401 {
                if let Some(store) = &self.token_store {
                    match store.clear() {
                        Ok(true) => tracing::warn!("401 response, cleared persisted auth token"),
                        Ok(false) => {}
                        Err(e) => tracing::error!(error = %e, "failed to clear auth token"),
                    }
                }
            }

            let code = status.canonical_reason().unwrap_or("Unknown").to_string();
            let error_body = response.text().await.unwrap_or_default();

            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&error_body) {
                let message = body
                    .message
                    .or(body.detail)
                    .unwrap_or_else(|| format!("HTTP {status_code}"));
                return Err(ApiError::new(status_code, code, message));
            }

            return Err(ApiError::new(
                status_code,
                code,
                format!("HTTP {status_code}: {error_body}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::new(0, "ParseError", format!("Failed to read response: {e}")))?;

        let data: T = serde_json::from_str(&body)
            .map_err(|e| ApiError::new(0, "ParseError", format!("Failed to parse JSON: {e}")))?;

        Ok(ApiResponse::new(status_code, headers, data))
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_network() {
        let error = ApiError::new(503, "ServiceUnavailable", "Service is down");
        assert_eq!(error.status(), 503);
        assert_eq!(error.code(), "ServiceUnavailable");
        assert_eq!(error.message(), "Service is down");
        assert!(error.is_network_error());
    }

    #[test]
    fn test_api_error_application() {
        let error = ApiError::new(400, "BadRequest", "Invalid email");
        assert!(!error.is_network_error());
        assert!(!error.is_unauthorized());
        assert_eq!(error.server_message(), Some("Invalid email"));
    }

    #[test]
    fn test_api_error_transport_has_no_server_message() {
        let error = ApiError::new(0, "NetworkError", "connection refused");
        assert!(error.is_network_error());
        assert_eq!(error.server_message(), None);
    }

    #[test]
    fn test_api_error_unauthorized() {
        let error = ApiError::new(401, "Unauthorized", "Token expired");
        assert!(error.is_unauthorized());
        assert!(!error.is_network_error());
    }

    #[test]
    fn test_api_request_builders() {
        let req = ApiRequest::get("/courses")
            .param("page", "2")
            .header("X-Client", "test");

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/courses");
        assert_eq!(req.params.get("page"), Some(&"2".to_string()));
        assert_eq!(req.headers.get("X-Client"), Some(&"test".to_string()));
        assert!(req.body.is_none());
    }

    #[test]
    fn test_api_request_json_body() {
        #[derive(Serialize)]
        struct Payload {
            email: String,
        }

        let req = ApiRequest::post("/auth/login")
            .json_body(&Payload { email: "a@b.com".to_string() })
            .unwrap();

        match req.body {
            Some(RequestBody::Json(bytes)) => {
                let body = String::from_utf8(bytes).unwrap();
                assert!(body.contains("a@b.com"));
            }
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn test_api_request_multipart() {
        let req = ApiRequest::post("/file/upload-cloudinary").multipart(vec![MultipartFile {
            field: "file".to_string(),
            file_name: "photo.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![1, 2, 3],
        }]);

        assert!(matches!(req.body, Some(RequestBody::Multipart(ref files)) if files.len() == 1));
    }

    #[test]
    fn test_api_response() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let response = ApiResponse::new(200, headers, "payload");

        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some(&"application/json".to_string()));
        assert_eq!(response.data, "payload");
    }

    #[test]
    fn test_client_config_default() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "https://api.passageapp.com/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("Passage/"));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ApiClientConfig::new("https://staging.passageapp.com/api/v1")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("PassageTest/1.0")
            .with_header("X-Env", "staging");

        assert_eq!(config.base_url, "https://staging.passageapp.com/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "PassageTest/1.0");
        assert_eq!(config.default_headers.get("X-Env"), Some(&"staging".to_string()));
    }

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::Put.as_str(), "PUT");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}

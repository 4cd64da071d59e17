//! Account, profile, and device preferences
//!
//! Profile reads/updates, the preferred-language setting, the support
//! form, and the device-level theme preference.

use api_client::http::{ApiClient, ApiError, ApiRequest, ApiResponse};
use api_client::types::{DataEnvelope, Role};
use app_state::query::{Query, QueryConfig, QueryError, QueryKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::kv::{DeviceStore, KvError};

/// A user's account profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Account id
    pub id: String,
    /// Full display name
    pub full_name: String,
    /// Email address
    pub email: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Account role
    #[serde(default)]
    pub user_type: Option<Role>,
    /// Avatar URL
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// Preferred content language code
    #[serde(default = "default_language")]
    pub preferred_language: String,
    /// Whether notifications are enabled
    #[serde(default)]
    pub notifications_enabled: bool,
    /// Courses currently in progress
    #[serde(default)]
    pub courses_in_progress: Option<u32>,
    /// Courses completed
    #[serde(default)]
    pub completed_courses_count: Option<u32>,
    /// Whether the account is verified
    #[serde(default)]
    pub is_verified: Option<bool>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Editable profile fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Full display name
    pub full_name: String,
    /// Preferred content language code
    pub preferred_language: String,
    /// Whether notifications are enabled
    pub notifications_enabled: bool,
}

/// A support form submission
#[derive(Debug, Clone, Serialize)]
pub struct SupportRequest {
    /// Contact email
    pub email: String,
    /// Sender name
    pub name: String,
    /// Free-form description
    pub description: String,
}

/// A selectable content language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// ISO code sent to the backend
    pub code: &'static str,
    /// English display name
    pub name: &'static str,
    /// Flag emoji for the picker
    pub flag: &'static str,
}

/// Languages offered by the language picker
pub const AVAILABLE_LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English", flag: "🇬🇧" },
    Language { code: "fr", name: "French", flag: "🇫🇷" },
    Language { code: "es", name: "Spanish", flag: "🇪🇸" },
    Language { code: "de", name: "German", flag: "🇩🇪" },
    Language { code: "nl", name: "Dutch", flag: "🇳🇱" },
    Language { code: "ar", name: "Arabic", flag: "🇸🇦" },
    Language { code: "zh", name: "Chinese", flag: "🇨🇳" },
    Language { code: "ja", name: "Japanese", flag: "🇯🇵" },
    Language { code: "ko", name: "Korean", flag: "🇰🇷" },
    Language { code: "pt", name: "Portuguese", flag: "🇵🇹" },
    Language { code: "ru", name: "Russian", flag: "🇷🇺" },
    Language { code: "hi", name: "Hindi", flag: "🇮🇳" },
];

#[derive(Debug, Clone, Deserialize)]
struct ProfileBody {
    user: UserProfile,
}

/// Typed client for account endpoints
#[derive(Clone)]
pub struct AccountService {
    client: Arc<ApiClient>,
}

impl AccountService {
    /// Create a new account service over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `GET /account/profile`
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let response: ApiResponse<DataEnvelope<ProfileBody>> =
            self.client.send(ApiRequest::get("/account/profile")).await?;
        Ok(response.data.data.user)
    }

    /// `PUT /account/profile`
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::put("/account/profile")
            .json_body(update)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: ApiResponse<DataEnvelope<ProfileBody>> = self.client.send(request).await?;
        Ok(response.data.data.user)
    }

    /// `PUT /account/language`
    pub async fn update_language(&self, language: &str) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::put("/account/language")
            .json_body(&serde_json::json!({ "language": language }))
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: ApiResponse<DataEnvelope<UserProfile>> = self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// `POST /support/submit`
    pub async fn contact_support(&self, request: &SupportRequest) -> Result<(), ApiError> {
        let request = ApiRequest::post("/support/submit")
            .json_body(request)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let _: ApiResponse<serde_json::Value> = self.client.send(request).await?;
        Ok(())
    }
}

/// Query for the signed-in user's profile
#[derive(Clone)]
pub struct ProfileQuery {
    service: AccountService,
}

impl ProfileQuery {
    /// Create a new profile query
    pub fn new(service: AccountService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Query for ProfileQuery {
    type Data = UserProfile;

    async fn fetch(&self) -> app_state::query::Result<Self::Data> {
        self.service
            .fetch_profile()
            .await
            .map_err(|e| QueryError::FetchError(e.to_string()))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("account", "profile")
    }

    fn config(&self) -> QueryConfig {
        QueryConfig {
            stale_time: std::time::Duration::from_secs(60),
            ..QueryConfig::default()
        }
    }
}

// =============================================================================
// Theme preference
// =============================================================================

/// KV key for the theme preference
pub const THEME_KEY: &str = "theme";

/// Color theme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
    /// Follow the OS setting
    #[default]
    System,
}

/// Device-persisted theme preference
pub struct ThemePreference {
    device: DeviceStore,
}

impl ThemePreference {
    /// Create a theme preference over the device store
    pub fn new(device: DeviceStore) -> Self {
        Self { device }
    }

    /// Read the stored theme, defaulting to following the OS
    pub fn get(&self) -> Result<Theme, KvError> {
        Ok(self.device.get(THEME_KEY)?.unwrap_or_default())
    }

    /// Persist a theme choice
    pub fn set(&self, theme: Theme) -> Result<(), KvError> {
        self.device.set(THEME_KEY, &theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use storage::kv::KvStore;

    #[test]
    fn test_profile_wire_shape() {
        let json = r#"{
            "id": "u_1",
            "fullName": "Amina Yusuf",
            "email": "a@b.com",
            "preferredLanguage": "fr",
            "notificationsEnabled": true,
            "completedCoursesCount": 2
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.full_name, "Amina Yusuf");
        assert_eq!(profile.preferred_language, "fr");
        assert!(profile.notifications_enabled);
        assert_eq!(profile.completed_courses_count, Some(2));
        assert!(profile.phone.is_none());
    }

    #[test]
    fn test_profile_defaults_language() {
        let json = r#"{"id":"u_1","fullName":"Amina","email":"a@b.com"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.preferred_language, "en");
    }

    #[test]
    fn test_language_codes_are_unique() {
        let codes: HashSet<_> = AVAILABLE_LANGUAGES.iter().map(|l| l.code).collect();
        assert_eq!(codes.len(), AVAILABLE_LANGUAGES.len());
        assert!(codes.contains("en"));
    }

    #[test]
    fn test_theme_round_trip() {
        let kv = Arc::new(KvStore::in_memory().unwrap());
        let prefs = ThemePreference::new(DeviceStore::new(kv));

        assert_eq!(prefs.get().unwrap(), Theme::System);

        prefs.set(Theme::Dark).unwrap();
        assert_eq!(prefs.get().unwrap(), Theme::Dark);
    }

    #[test]
    fn test_theme_wire_names() {
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        assert_eq!(serde_json::to_string(&Theme::System).unwrap(), "\"system\"");
    }
}

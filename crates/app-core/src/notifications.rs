//! In-app notifications
//!
//! Listing, read-state management, and the unread badge count.

use api_client::http::{ApiClient, ApiError, ApiRequest, ApiResponse};
use api_client::types::{Acknowledgement, DataEnvelope, ResultsEnvelope};
use app_state::query::{Query, QueryConfig, QueryError, QueryKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notification severity/category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Informational
    Info,
    /// Positive outcome
    Success,
    /// Needs attention
    Warning,
    /// Something failed
    Error,
}

/// A notification delivered to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification id
    #[serde(rename = "_id")]
    pub id: String,
    /// Title line
    pub title: String,
    /// Body message
    pub message: String,
    /// Severity/category
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Whether the user has opened it
    #[serde(default)]
    pub is_read: bool,
    /// Delivery time
    pub created_at: DateTime<Utc>,
    /// Optional deep link
    #[serde(default)]
    pub link: Option<String>,
}

/// Count of unread notifications, for the badge
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

/// Typed client for notification endpoints
#[derive(Clone)]
pub struct NotificationService {
    client: Arc<ApiClient>,
}

impl NotificationService {
    /// Create a new notification service over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `GET /notifications`
    pub async fn list(&self) -> Result<Vec<Notification>, ApiError> {
        let response: ApiResponse<ResultsEnvelope<Notification>> =
            self.client.send(ApiRequest::get("/notifications")).await?;
        Ok(response.data.results)
    }

    /// `GET /notifications/{id}`
    pub async fn get(&self, id: &str) -> Result<Notification, ApiError> {
        let response: ApiResponse<DataEnvelope<Notification>> = self
            .client
            .send(ApiRequest::get(format!("/notifications/{id}")))
            .await?;
        Ok(response.data.data)
    }

    /// `DELETE /notifications/{id}`
    pub async fn delete(&self, id: &str) -> Result<Acknowledgement, ApiError> {
        let response: ApiResponse<Acknowledgement> = self
            .client
            .send(ApiRequest::delete(format!("/notifications/{id}")))
            .await?;
        Ok(response.data)
    }

    /// `PUT /notifications/{id}/read`
    pub async fn mark_read(&self, id: &str) -> Result<Acknowledgement, ApiError> {
        let response: ApiResponse<Acknowledgement> = self
            .client
            .send(ApiRequest::put(format!("/notifications/{id}/read")))
            .await?;
        Ok(response.data)
    }

    /// `PUT /notifications/read/all`
    pub async fn mark_all_read(&self) -> Result<Acknowledgement, ApiError> {
        let response: ApiResponse<Acknowledgement> = self
            .client
            .send(ApiRequest::put("/notifications/read/all"))
            .await?;
        Ok(response.data)
    }
}

/// Query for the notification list
#[derive(Clone)]
pub struct NotificationsQuery {
    service: NotificationService,
}

impl NotificationsQuery {
    /// Create a new notifications query
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Query for NotificationsQuery {
    type Data = Vec<Notification>;

    async fn fetch(&self) -> app_state::query::Result<Self::Data> {
        self.service
            .list()
            .await
            .map_err(|e| QueryError::FetchError(e.to_string()))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("notifications", "list")
    }

    fn config(&self) -> QueryConfig {
        QueryConfig {
            stale_time: std::time::Duration::from_secs(30),
            ..QueryConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::http::ApiClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification_json(id: &str, is_read: bool) -> serde_json::Value {
        json!({
            "_id": id,
            "title": "Payment received",
            "message": "Your enrolment is confirmed",
            "type": "success",
            "isRead": is_read,
            "createdAt": "2025-03-02T10:00:00Z"
        })
    }

    #[test]
    fn test_notification_wire_shape() {
        let n: Notification = serde_json::from_value(notification_json("n_1", false)).unwrap();
        assert_eq!(n.id, "n_1");
        assert_eq!(n.kind, NotificationKind::Success);
        assert!(!n.is_read);
        assert!(n.link.is_none());
    }

    #[test]
    fn test_unread_count() {
        let notifications: Vec<Notification> = vec![
            serde_json::from_value(notification_json("n_1", false)).unwrap(),
            serde_json::from_value(notification_json("n_2", true)).unwrap(),
            serde_json::from_value(notification_json("n_3", false)).unwrap(),
        ];

        assert_eq!(unread_count(&notifications), 2);
        assert_eq!(unread_count(&[]), 0);
    }

    #[tokio::test]
    async fn test_list_and_mark_read() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [notification_json("n_1", false)]
            })))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/notifications/n_1/read"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let client = Arc::new(ApiClient::new(ApiClientConfig::new(server.uri())));
        let service = NotificationService::new(client);

        let notifications = service.list().await.unwrap();
        assert_eq!(notifications.len(), 1);

        let ack = service.mark_read("n_1").await.unwrap();
        assert!(ack.success);
    }
}

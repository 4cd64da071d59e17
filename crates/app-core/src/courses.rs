//! Courses, lessons, and ratings
//!
//! Typed reads and writes for the course catalogue, plus queries for
//! the screens that list and detail courses.

use api_client::http::{ApiClient, ApiError, ApiRequest, ApiResponse};
use api_client::types::{DataEnvelope, ResultsEnvelope};
use app_state::query::{Query, QueryConfig, QueryError, QueryKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A course in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Course id
    #[serde(rename = "_id")]
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Category label
    #[serde(default)]
    pub category: String,
    /// Total duration label (e.g., "4h 30m")
    #[serde(default)]
    pub duration: Option<String>,
    /// Price label; absent for free courses
    #[serde(default)]
    pub price: Option<String>,
    /// Whether the signed-in user bookmarked this course
    #[serde(default)]
    pub is_bookmarked: Option<bool>,
    /// Completion percentage for the signed-in user
    #[serde(default)]
    pub progress: Option<f32>,
    /// Whether the signed-in user completed the course
    #[serde(default)]
    pub is_completed: bool,
    /// Whether the signed-in user is enrolled
    #[serde(default)]
    pub is_enrolled: bool,
    /// Whether the course is free
    #[serde(default)]
    pub is_free: bool,
    /// Average rating across reviews
    #[serde(default)]
    pub average_rating: Option<f32>,
    /// Number of ratings
    #[serde(default)]
    pub total_ratings: u32,
    /// Number of lessons
    #[serde(default)]
    pub lesson_count: u32,
}

/// A review left on a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRating {
    /// Rating id
    pub id: String,
    /// Reviewer id
    pub user_id: String,
    /// Reviewer display name
    pub user_name: String,
    /// Stars, 1-5
    pub rating: u8,
    /// Optional comment
    #[serde(default)]
    pub comment: Option<String>,
    /// When the review was left
    pub created_at: DateTime<Utc>,
}

/// A lesson within a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Lesson id
    pub id: String,
    /// Owning course id
    pub course_id: String,
    /// Title
    pub title: String,
    /// Body content
    #[serde(default)]
    pub content: Option<String>,
    /// Duration label
    #[serde(default)]
    pub duration: String,
    /// Position within the course
    pub order: u32,
    /// Video URL
    #[serde(default)]
    pub video_url: Option<String>,
    /// Audio URL
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Response to a bookmark toggle
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggle {
    /// Server message
    #[serde(default)]
    pub message: String,
    /// The new bookmark state
    pub is_bookmarked: bool,
}

/// New rating payload
#[derive(Debug, Clone, Serialize)]
pub struct RateCourse {
    /// Stars, 1-5
    pub rating: u8,
    /// Optional comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Typed client for course endpoints
#[derive(Clone)]
pub struct CourseService {
    client: Arc<ApiClient>,
}

impl CourseService {
    /// Create a new course service over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `GET /courses`
    pub async fn list(&self) -> Result<Vec<Course>, ApiError> {
        let response: ApiResponse<ResultsEnvelope<Course>> =
            self.client.send(ApiRequest::get("/courses")).await?;
        Ok(response.data.results)
    }

    /// `GET /courses/{id}`
    pub async fn get(&self, course_id: &str) -> Result<Course, ApiError> {
        let response: ApiResponse<DataEnvelope<Course>> = self
            .client
            .send(ApiRequest::get(format!("/courses/{course_id}")))
            .await?;
        Ok(response.data.data)
    }

    /// `POST /courses/{id}/bookmark`
    pub async fn toggle_bookmark(&self, course_id: &str) -> Result<BookmarkToggle, ApiError> {
        let response: ApiResponse<BookmarkToggle> = self
            .client
            .send(ApiRequest::post(format!("/courses/{course_id}/bookmark")))
            .await?;
        Ok(response.data)
    }

    /// `GET /courses/user/bookmarked`
    pub async fn bookmarked(&self) -> Result<Vec<Course>, ApiError> {
        let response: ApiResponse<DataEnvelope<Vec<Course>>> = self
            .client
            .send(ApiRequest::get("/courses/user/bookmarked"))
            .await?;
        Ok(response.data.data)
    }

    /// `GET /lessons/course/{id}`
    pub async fn lessons(&self, course_id: &str) -> Result<Vec<Lesson>, ApiError> {
        let response: ApiResponse<DataEnvelope<Vec<Lesson>>> = self
            .client
            .send(ApiRequest::get(format!("/lessons/course/{course_id}")))
            .await?;
        Ok(response.data.data)
    }

    /// `GET /lessons/lesson/{id}`
    pub async fn lesson(&self, lesson_id: &str) -> Result<Lesson, ApiError> {
        let response: ApiResponse<DataEnvelope<Lesson>> = self
            .client
            .send(ApiRequest::get(format!("/lessons/lesson/{lesson_id}")))
            .await?;
        Ok(response.data.data)
    }

    /// `GET /courses/{id}/ratings`
    pub async fn ratings(&self, course_id: &str) -> Result<Vec<CourseRating>, ApiError> {
        let response: ApiResponse<ResultsEnvelope<CourseRating>> = self
            .client
            .send(ApiRequest::get(format!("/courses/{course_id}/ratings")))
            .await?;
        Ok(response.data.results)
    }

    /// `POST /courses/{id}/ratings`
    pub async fn rate(&self, course_id: &str, rating: &RateCourse) -> Result<CourseRating, ApiError> {
        let request = ApiRequest::post(format!("/courses/{course_id}/ratings"))
            .json_body(rating)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: ApiResponse<DataEnvelope<CourseRating>> = self.client.send(request).await?;
        Ok(response.data.data)
    }
}

/// Query for the course list
#[derive(Clone)]
pub struct CoursesQuery {
    service: CourseService,
}

impl CoursesQuery {
    /// Create a new course list query
    pub fn new(service: CourseService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Query for CoursesQuery {
    type Data = Vec<Course>;

    async fn fetch(&self) -> app_state::query::Result<Self::Data> {
        self.service
            .list()
            .await
            .map_err(|e| QueryError::FetchError(e.to_string()))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("courses", "list")
    }

    fn config(&self) -> QueryConfig {
        QueryConfig {
            stale_time: std::time::Duration::from_secs(60),
            ..QueryConfig::default()
        }
    }
}

/// Query for one course
#[derive(Clone)]
pub struct CourseQuery {
    service: CourseService,
    course_id: String,
}

impl CourseQuery {
    /// Create a new course detail query
    pub fn new(service: CourseService, course_id: impl Into<String>) -> Self {
        Self { service, course_id: course_id.into() }
    }
}

#[async_trait]
impl Query for CourseQuery {
    type Data = Course;

    async fn fetch(&self) -> app_state::query::Result<Self::Data> {
        self.service
            .get(&self.course_id)
            .await
            .map_err(|e| QueryError::FetchError(e.to_string()))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("courses", "detail").with_param("courseId", &self.course_id)
    }
}

/// Query for a course's lessons
#[derive(Clone)]
pub struct CourseLessonsQuery {
    service: CourseService,
    course_id: String,
}

impl CourseLessonsQuery {
    /// Create a new lessons query
    pub fn new(service: CourseService, course_id: impl Into<String>) -> Self {
        Self { service, course_id: course_id.into() }
    }
}

#[async_trait]
impl Query for CourseLessonsQuery {
    type Data = Vec<Lesson>;

    async fn fetch(&self) -> app_state::query::Result<Self::Data> {
        self.service
            .lessons(&self.course_id)
            .await
            .map_err(|e| QueryError::FetchError(e.to_string()))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("courses", "lessons").with_param("courseId", &self.course_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::http::ApiClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn course_json(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "title": "IELTS Preparation",
            "description": "Full preparation course",
            "category": "Language",
            "isFree": false,
            "price": "49.99",
            "totalRatings": 12,
            "lessonCount": 24,
            "isBookmarked": false,
            "isCompleted": false,
            "isEnrolled": true
        })
    }

    #[test]
    fn test_course_parses_mongo_id() {
        let course: Course = serde_json::from_value(course_json("c_1")).unwrap();
        assert_eq!(course.id, "c_1");
        assert_eq!(course.lesson_count, 24);
        assert!(course.is_enrolled);
        assert!(!course.is_free);
    }

    #[test]
    fn test_course_minimal_payload() {
        let course: Course =
            serde_json::from_value(json!({"_id": "c_2", "title": "T", "description": "D"}))
                .unwrap();
        assert_eq!(course.total_ratings, 0);
        assert!(course.is_bookmarked.is_none());
        assert!(course.duration.is_none());
    }

    #[test]
    fn test_rating_timestamp_parses() {
        let rating: CourseRating = serde_json::from_value(json!({
            "id": "r_1",
            "userId": "u_1",
            "userName": "Amina",
            "rating": 5,
            "createdAt": "2025-03-02T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(rating.rating, 5);
        assert_eq!(rating.created_at.to_rfc3339(), "2025-03-02T10:00:00+00:00");
    }

    #[tokio::test]
    async fn test_list_and_bookmark_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [course_json("c_1"), course_json("c_2")]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/courses/c_1/bookmark"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Course bookmarked",
                "isBookmarked": true
            })))
            .mount(&server)
            .await;

        let client = Arc::new(ApiClient::new(ApiClientConfig::new(server.uri())));
        let service = CourseService::new(client);

        let courses = service.list().await.unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].title, "IELTS Preparation");

        let toggle = service.toggle_bookmark("c_1").await.unwrap();
        assert!(toggle.is_bookmarked);
    }

    #[tokio::test]
    async fn test_course_query_key_includes_course_id() {
        let client = Arc::new(ApiClient::new(ApiClientConfig::new("http://127.0.0.1:9")));
        let service = CourseService::new(client);

        let a = CourseQuery::new(service.clone(), "c_1");
        let b = CourseQuery::new(service, "c_2");

        assert_ne!(a.key().to_cache_key(), b.key().to_cache_key());
        assert_eq!(a.key().scope, "courses");
    }
}

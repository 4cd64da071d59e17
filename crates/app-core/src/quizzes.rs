//! Quizzes
//!
//! Quiz retrieval per course, answer submission, and the helper that
//! turns screen-level answers into the submission shape the backend
//! marks.

use api_client::http::{ApiClient, ApiError, ApiRequest, ApiResponse};
use api_client::types::{DataEnvelope, ResultsEnvelope};
use app_state::query::{Query, QueryConfig, QueryError, QueryKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How a question is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    /// Pick one option
    SingleChoice,
    /// Pick any number of options
    MultipleChoice,
    /// True/false
    Boolean,
    /// Free-text answer
    FillInBlank,
}

/// One selectable option on a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    /// Option id
    #[serde(rename = "_id")]
    pub id: String,
    /// Option text
    pub option: String,
}

/// A quiz question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Question id
    #[serde(rename = "_id")]
    pub id: String,
    /// Question text
    pub question: String,
    /// How it is answered
    pub question_type: QuestionType,
    /// Options for choice questions
    #[serde(default)]
    pub options: Vec<QuizOption>,
    /// Position within the quiz
    #[serde(default)]
    pub order: u32,
}

/// A quiz attached to a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    /// Quiz id
    #[serde(rename = "_id")]
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Owning course id
    pub course_id: String,
    /// Questions in order
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One answer in a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmissionAnswer {
    /// Question being answered
    pub question_id: String,
    /// The question's type, echoed for marking
    pub question_type: QuestionType,
    /// Selected option for single choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
    /// Selected options for multiple choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_ids: Option<Vec<String>>,
    /// Boolean or free-text answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<serde_json::Value>,
}

/// A full quiz submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSubmission {
    /// Answers, one per answered question
    pub answers: Vec<QuizSubmissionAnswer>,
}

/// Per-question marking outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswerResult {
    /// Question id
    pub question_id: String,
    /// The question's type
    pub question_type: QuestionType,
    /// Whether the answer was correct
    pub is_correct: bool,
    /// The expected answer for fill-in-blank review
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// Marked quiz result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// Quiz title
    pub quiz_title: String,
    /// Score, 0-100
    pub score: u32,
    /// Number of correct answers
    pub correct_answers: u32,
    /// Number of questions
    pub total_questions: u32,
    /// How many attempts the user has made
    #[serde(default)]
    pub attempts: u32,
    /// Per-question outcomes
    #[serde(default)]
    pub answers: Vec<QuizAnswerResult>,
}

/// An answer as the quiz screen captures it, keyed by question index
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenAnswer {
    /// Selected option text for single choice
    Single(String),
    /// Selected option texts for multiple choice
    Multiple(Vec<String>),
    /// True/false answer
    Boolean(bool),
    /// Free-text answer
    Text(String),
}

/// Build a submission from screen answers
///
/// Choice answers arrive as option text; they are resolved to option
/// ids against the quiz. Answers for unknown question indices are
/// skipped.
pub fn prepare_submission(quiz: &Quiz, answers: &HashMap<usize, ScreenAnswer>) -> QuizSubmission {
    let mut submission_answers = Vec::new();

    let mut indices: Vec<_> = answers.keys().copied().collect();
    indices.sort_unstable();

    for index in indices {
        let Some(question) = quiz.questions.get(index) else {
            continue;
        };
        let answer = &answers[&index];

        let mut entry = QuizSubmissionAnswer {
            question_id: question.id.clone(),
            question_type: question.question_type,
            selected_option_id: None,
            selected_option_ids: None,
            answer: None,
        };

        match (question.question_type, answer) {
            (QuestionType::SingleChoice, ScreenAnswer::Single(text)) => {
                entry.selected_option_id = question
                    .options
                    .iter()
                    .find(|o| &o.option == text)
                    .map(|o| o.id.clone());
            }
            (QuestionType::MultipleChoice, ScreenAnswer::Multiple(texts)) => {
                entry.selected_option_ids = Some(
                    question
                        .options
                        .iter()
                        .filter(|o| texts.contains(&o.option))
                        .map(|o| o.id.clone())
                        .collect(),
                );
            }
            (QuestionType::Boolean, ScreenAnswer::Boolean(value)) => {
                entry.answer = Some(serde_json::Value::Bool(*value));
            }
            (QuestionType::FillInBlank, ScreenAnswer::Text(text)) => {
                entry.answer = Some(serde_json::Value::String(text.clone()));
            }
            // Mismatched answer kind for the question; skip it
            _ => continue,
        }

        submission_answers.push(entry);
    }

    QuizSubmission { answers: submission_answers }
}

/// Typed client for quiz endpoints
#[derive(Clone)]
pub struct QuizService {
    client: Arc<ApiClient>,
}

impl QuizService {
    /// Create a new quiz service over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `GET /quizzes/course/{id}`
    pub async fn for_course(&self, course_id: &str) -> Result<Vec<Quiz>, ApiError> {
        let response: ApiResponse<ResultsEnvelope<Quiz>> = self
            .client
            .send(ApiRequest::get(format!("/quizzes/course/{course_id}")))
            .await?;
        Ok(response.data.results)
    }

    /// `POST /quizzes/{id}/mark`
    pub async fn submit(
        &self,
        quiz_id: &str,
        submission: &QuizSubmission,
    ) -> Result<QuizResult, ApiError> {
        let request = ApiRequest::post(format!("/quizzes/{quiz_id}/mark"))
            .json_body(submission)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: ApiResponse<DataEnvelope<QuizResult>> = self.client.send(request).await?;
        Ok(response.data.data)
    }
}

/// Query for a course's quizzes
#[derive(Clone)]
pub struct CourseQuizzesQuery {
    service: QuizService,
    course_id: String,
}

impl CourseQuizzesQuery {
    /// Create a new course quizzes query
    pub fn new(service: QuizService, course_id: impl Into<String>) -> Self {
        Self { service, course_id: course_id.into() }
    }
}

#[async_trait]
impl Query for CourseQuizzesQuery {
    type Data = Vec<Quiz>;

    async fn fetch(&self) -> app_state::query::Result<Self::Data> {
        self.service
            .for_course(&self.course_id)
            .await
            .map_err(|e| QueryError::FetchError(e.to_string()))
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("quizzes", "by-course").with_param("courseId", &self.course_id)
    }

    fn config(&self) -> QueryConfig {
        QueryConfig {
            stale_time: std::time::Duration::from_secs(120),
            ..QueryConfig::default()
        }
    }
}

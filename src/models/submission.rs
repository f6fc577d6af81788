// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One left/right pairing in a matching answer.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchPair {
    pub left_id: i64,
    pub right_id: i64,
}

/// Type-appropriate answer payload. The wire shape is disambiguated by the
/// field name: `text`, `option_ids` or `pairs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnswerPayload {
    Text { text: String },
    Selection { option_ids: Vec<i64> },
    Pairs { pairs: Vec<MatchPair> },
}

/// One submitted answer, referencing an exercise by id.
/// Unknown exercise ids are tolerated and dropped during grading.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub exercise_id: i64,
    #[serde(flatten)]
    pub payload: AnswerPayload,
}

/// DTO for submitting a whole lesson.
///
/// `lesson_id` is optional; when present it must match the lesson addressed
/// by the URL or the submission is rejected before grading.
#[derive(Debug, Deserialize)]
pub struct SubmitLessonRequest {
    pub lesson_id: Option<i64>,
    pub answers: Vec<SubmittedAnswer>,
}

/// Result of grading one submission batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct GradeResult {
    pub correct: i32,
    pub total: i32,
    /// 0-3, stepped on the correct count (not the ratio).
    pub stars: i32,
}

/// Response body for the submit endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct GradeResponse {
    pub correct: i32,
    pub total: i32,
    pub stars: i32,
    /// Whether a durable result row was written (authenticated submissions only).
    pub recorded: bool,
}

/// Represents the 'lesson_results' table: one row per graded, authenticated
/// submission. Append-only; resubmission adds a new row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LessonResult {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub correct: i32,
    pub total: i32,
    pub stars: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

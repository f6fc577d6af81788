// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Represents the 'exercise_attempts' table: one row per attempt of one
/// exercise by one user. Written by authenticated submissions and by the
/// self-report endpoint; read by the progress aggregator.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,
    pub correct: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for self-reporting an attempt on a client-evaluated exercise.
#[derive(Debug, Deserialize)]
pub struct RecordAttemptRequest {
    pub correct: bool,
}

/// Reduced attempt history for a single exercise.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExerciseStats {
    pub exercise_id: i64,
    pub attempts: i64,
    pub correct: i64,
    pub wrong: i64,
    /// correct / attempts * 100, rounded to 2 decimal places; 0 with no attempts.
    pub accuracy: f64,
    pub last_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
    /// At least one correct attempt exists.
    pub completed: bool,
}

/// Lesson-level analytics derived from the attempt history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LessonAnalytics {
    pub lesson_id: i64,
    pub total_exercises: i64,
    pub completed_exercises: i64,
    /// completed / total; 0 for an empty lesson.
    pub completion_ratio: f64,
    /// completion_ratio >= 0.70.
    pub completed: bool,
    /// 0-3, stepped on the completion ratio (not the correct count).
    pub stars: i32,
    /// Sum of the xp_weight of completed exercises.
    pub xp_earned: i32,
    pub exercises: Vec<ExerciseStats>,
}

impl LessonAnalytics {
    /// Zero-valued analytics, returned to anonymous callers instead of 401.
    pub fn empty(lesson_id: i64) -> Self {
        Self {
            lesson_id,
            total_exercises: 0,
            completed_exercises: 0,
            completion_ratio: 0.0,
            completed: false,
            stars: 0,
            xp_earned: 0,
            exercises: Vec::new(),
        }
    }
}

/// Per-lesson line in the user's progress overview.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LessonProgressSummary {
    pub lesson_id: i64,
    pub slug: String,
    pub title: String,
    pub xp_earned: i32,
    pub completed: bool,
    /// Best star rating across all submissions of this lesson.
    pub best_stars: i32,
}

/// Aggregated progress overview for the current user.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressOverview {
    pub total_xp: i64,
    pub lessons_completed: i64,
    pub lessons: Vec<LessonProgressSummary>,
}

/// A row on the XP leaderboard.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_xp: i64,
    pub lessons_completed: i64,
}

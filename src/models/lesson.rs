// src/models/lesson.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::exercise::PublicExercise;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// Represents the 'lessons' table in the database.
/// Authored through the admin/CMS surface; read-only for learners.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,

    /// Unique, URL-safe identifier (e.g., "alphabet-1").
    pub slug: String,

    pub title: String,

    pub description: Option<String>,

    /// Difficulty level, 1 (easiest) and up.
    pub level: i16,

    /// XP granted once the lesson reaches completed state.
    pub xp_reward: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A lesson can be addressed by numeric id or by slug in URL paths.
#[derive(Debug, Clone)]
pub enum LessonIdent {
    Id(i64),
    Slug(String),
}

impl From<String> for LessonIdent {
    fn from(raw: String) -> Self {
        match raw.parse::<i64>() {
            Ok(id) => LessonIdent::Id(id),
            Err(_) => LessonIdent::Slug(raw),
        }
    }
}

/// Row shape for the lesson list endpoint (includes exercise count).
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LessonSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub level: i16,
    pub xp_reward: i32,
    pub exercise_count: i64,
}

/// Full lesson payload for learners: ordered exercises with their options,
/// answer keys stripped.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicLesson {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub level: i16,
    pub xp_reward: i32,
    pub exercises: Vec<PublicExercise>,
}

/// DTO for creating or importing a lesson.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 100), custom(function = validate_slug))]
    pub slug: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub level: i16,
    #[validate(range(min = 0, max = 10000))]
    pub xp_reward: i32,
}

/// DTO for partially updating a lesson. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<i16>,
    pub xp_reward: Option<i32>,
}

/// Validates that a slug is lowercase alphanumeric with single dashes.
fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(validator::ValidationError::new("invalid_slug"));
    }
    Ok(())
}

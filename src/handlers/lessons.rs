// src/handlers/lessons.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        exercise::PublicExercise,
        lesson::{LessonIdent, PublicLesson},
    },
    store,
};

/// Lists all lessons with their exercise counts.
pub async fn list_lessons(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let lessons = store::list_lessons(&pool).await.map_err(|e| {
        tracing::error!("Failed to list lessons: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(lessons))
}

/// Retrieves one exercise with its options, answer keys stripped.
pub async fn get_exercise(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exercise = store::fetch_exercise(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Exercise not found".to_string()))?;

    let options = store::fetch_exercise_options(&pool, exercise.id).await?;

    Ok(Json(PublicExercise::from_parts(exercise, options)))
}

/// Retrieves a single lesson by numeric id or slug, with its exercises and
/// options in presentation order. Answer keys never leave the server: the
/// response goes through `PublicExercise`, which drops `expected_answer`,
/// `is_correct` and `match_key`.
pub async fn get_lesson(
    State(pool): State<PgPool>,
    Path(ident): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ident = LessonIdent::from(ident);

    let (lesson, exercises) = store::fetch_lesson_with_exercises(&pool, &ident)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    let exercises: Vec<PublicExercise> = exercises
        .into_iter()
        .map(|e| PublicExercise::from_parts(e.exercise, e.options))
        .collect();

    Ok(Json(PublicLesson {
        id: lesson.id,
        slug: lesson.slug,
        title: lesson.title,
        description: lesson.description,
        level: lesson.level,
        xp_reward: lesson.xp_reward,
        exercises,
    }))
}

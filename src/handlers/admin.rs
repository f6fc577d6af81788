// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exercise::CreateExerciseRequest,
        lesson::{CreateLessonRequest, UpdateLessonRequest},
    },
    store,
    utils::html::clean_html,
};

fn map_unique_violation(e: sqlx::Error, what: &str) -> AppError {
    if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
        AppError::Conflict(format!("{what} already exists"))
    } else {
        tracing::error!("Database error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    }
}

/// Creates a new lesson.
/// Admin only.
pub async fn create_lesson(
    State(pool): State<PgPool>,
    Json(mut payload): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload.description = payload.description.as_deref().map(clean_html);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lessons (slug, title, description, level, xp_reward)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&payload.slug)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.level)
    .bind(payload.xp_reward)
    .fetch_one(&pool)
    .await
    .map_err(|e| map_unique_violation(e, &format!("Lesson slug '{}'", payload.slug)))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates lesson metadata. Fields are optional; the slug is immutable.
/// Admin only.
pub async fn update_lesson(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _exists: i64 = sqlx::query_scalar("SELECT id FROM lessons WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    if let Some(title) = payload.title {
        sqlx::query("UPDATE lessons SET title = $1 WHERE id = $2")
            .bind(title)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(description) = payload.description {
        sqlx::query("UPDATE lessons SET description = $1 WHERE id = $2")
            .bind(clean_html(&description))
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(level) = payload.level {
        sqlx::query("UPDATE lessons SET level = $1 WHERE id = $2")
            .bind(level)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(xp_reward) = payload.xp_reward {
        sqlx::query("UPDATE lessons SET xp_reward = $1 WHERE id = $2")
            .bind(xp_reward)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(Json(serde_json::json!({ "message": "Lesson updated" })))
}

/// Deletes a lesson and, via FK cascade, its exercises and options.
/// Admin only.
pub async fn delete_lesson(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates an exercise (with options) under a lesson.
/// Admin only.
pub async fn create_exercise(
    State(pool): State<PgPool>,
    Path(lesson_id): Path<i64>,
    Json(mut payload): Json<CreateExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload.check_consistency().map_err(AppError::BadRequest)?;
    payload.prompt = clean_html(&payload.prompt);

    let _exists: i64 = sqlx::query_scalar("SELECT id FROM lessons WHERE id = $1")
        .bind(lesson_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    let mut tx = pool.begin().await?;
    let exercise_id = store::insert_exercise(&mut *tx, lesson_id, &payload)
        .await
        .map_err(|e| {
            map_unique_violation(e, &format!("Exercise position {}", payload.position))
        })?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": exercise_id })),
    ))
}

/// DTO for updating an exercise. Fields are optional; when `options` is
/// present the option set is replaced wholesale.
#[derive(Debug, Deserialize)]
pub struct UpdateExerciseRequest {
    pub position: Option<i32>,
    pub prompt: Option<String>,
    pub expected_answer: Option<String>,
    pub case_sensitive: Option<bool>,
    pub xp_weight: Option<i32>,
    pub options: Option<Vec<crate::models::exercise::CreateOptionRequest>>,
}

/// Updates exercise fields.
/// Admin only.
pub async fn update_exercise(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _exists: i64 = sqlx::query_scalar("SELECT id FROM exercises WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exercise not found".to_string()))?;

    if let Some(position) = payload.position {
        sqlx::query("UPDATE exercises SET position = $1 WHERE id = $2")
            .bind(position)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| map_unique_violation(e, &format!("Exercise position {position}")))?;
    }

    if let Some(prompt) = payload.prompt {
        sqlx::query("UPDATE exercises SET prompt = $1 WHERE id = $2")
            .bind(clean_html(&prompt))
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(expected_answer) = payload.expected_answer {
        sqlx::query("UPDATE exercises SET expected_answer = $1 WHERE id = $2")
            .bind(expected_answer)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(case_sensitive) = payload.case_sensitive {
        sqlx::query("UPDATE exercises SET case_sensitive = $1 WHERE id = $2")
            .bind(case_sensitive)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(xp_weight) = payload.xp_weight {
        sqlx::query("UPDATE exercises SET xp_weight = $1 WHERE id = $2")
            .bind(xp_weight)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(options) = payload.options {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM exercise_options WHERE exercise_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for option in &options {
            sqlx::query(
                r#"
                INSERT INTO exercise_options
                    (exercise_id, text, is_correct, side, match_key, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(&option.text)
            .bind(option.is_correct)
            .bind(&option.side)
            .bind(&option.match_key)
            .bind(option.position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
    }

    Ok(Json(serde_json::json!({ "message": "Exercise updated" })))
}

/// Deletes an exercise and its options.
/// Admin only.
pub async fn delete_exercise(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exercises WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exercise not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

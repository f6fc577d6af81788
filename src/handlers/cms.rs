// src/handlers/cms.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{exercise::CreateExerciseRequest, lesson::CreateLessonRequest},
    store,
    utils::html::clean_html,
};

/// DTO for importing a whole lesson with its exercises in one call.
/// This is the seeding path used by the content pipeline.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct ImportLessonRequest {
    #[validate(nested)]
    pub lesson: CreateLessonRequest,
    #[validate(nested)]
    pub exercises: Vec<CreateExerciseRequest>,
}

/// Imports (or re-imports) a lesson. Idempotent on the slug: an existing
/// lesson is updated in place and its exercise set replaced wholesale, so
/// re-running a content pipeline converges instead of erroring.
///
/// Gated by the configured CMS token set, not by user accounts.
pub async fn import_lesson(
    State(pool): State<PgPool>,
    Json(mut payload): Json<ImportLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    for exercise in &payload.exercises {
        exercise.check_consistency().map_err(AppError::BadRequest)?;
    }

    payload.lesson.description = payload.lesson.description.as_deref().map(clean_html);
    for exercise in &mut payload.exercises {
        exercise.prompt = clean_html(&exercise.prompt);
    }

    let mut tx = pool.begin().await?;

    let lesson_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lessons (slug, title, description, level, xp_reward)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (slug) DO UPDATE SET
            title = EXCLUDED.title,
            description = EXCLUDED.description,
            level = EXCLUDED.level,
            xp_reward = EXCLUDED.xp_reward
        RETURNING id
        "#,
    )
    .bind(&payload.lesson.slug)
    .bind(&payload.lesson.title)
    .bind(&payload.lesson.description)
    .bind(payload.lesson.level)
    .bind(payload.lesson.xp_reward)
    .fetch_one(&mut *tx)
    .await?;

    // Replace the exercise set wholesale; attempt history survives only
    // for ids that are re-created, which is why re-imports of existing
    // content should go through admin updates instead.
    sqlx::query("DELETE FROM exercises WHERE lesson_id = $1")
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;

    let mut imported = 0usize;
    for exercise in &payload.exercises {
        store::insert_exercise(&mut *tx, lesson_id, exercise).await?;
        imported += 1;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit lesson import: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Imported lesson '{}' with {} exercises",
        payload.lesson.slug,
        imported
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "lesson_id": lesson_id,
            "exercises": imported
        })),
    ))
}

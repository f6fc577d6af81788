// src/handlers/submit.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    error::AppError,
    grading::{self, Verdict},
    models::{
        exercise::Exercise,
        lesson::LessonIdent,
        submission::{GradeResponse, SubmitLessonRequest},
    },
    store,
    utils::jwt::Claims,
};

/// Grades a submitted batch of answers against a lesson.
///
/// Anonymous callers get the grade back and nothing is stored. For
/// authenticated callers one `lesson_results` row is appended (never
/// updated), one attempt row is written per evaluated answer, and the
/// lesson's aggregate progress is refreshed, all under one transaction.
pub async fn submit_lesson(
    State(pool): State<PgPool>,
    Path(ident): Path<String>,
    claims: Option<Extension<Claims>>,
    Json(req): Json<SubmitLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ident = LessonIdent::from(ident);

    let (lesson, exercises) = store::fetch_lesson_with_exercises(&pool, &ident)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    // A body lesson id that disagrees with the URL is rejected before
    // grading begins.
    if let Some(body_lesson_id) = req.lesson_id {
        if body_lesson_id != lesson.id {
            return Err(AppError::BadRequest(format!(
                "Submission is for lesson {} but was posted to lesson {}",
                body_lesson_id, lesson.id
            )));
        }
    }

    let outcome = grading::grade(&exercises, &req.answers);

    let mut recorded = false;
    if let Some(Extension(claims)) = claims {
        let user_id = claims.user_id();
        let mut tx = pool.begin().await?;

        store::append_lesson_result(&mut *tx, user_id, lesson.id, &outcome.result).await?;

        for (exercise_id, verdict) in &outcome.verdicts {
            // Skipped answers (empty matching, presentation-only kinds)
            // are not attempts and leave no history row.
            if *verdict != Verdict::Skipped {
                store::insert_attempt(&mut *tx, user_id, *exercise_id, *verdict == Verdict::Correct)
                    .await?;
            }
        }

        // Refresh the aggregate progress row from the updated history.
        let history = store::fetch_attempt_history(&mut *tx, user_id, lesson.id).await?;
        let plain: Vec<Exercise> = exercises.iter().map(|e| e.exercise.clone()).collect();
        let analytics = grading::aggregate(&lesson, &plain, &history);

        let xp_earned = analytics.xp_earned
            + if analytics.completed { lesson.xp_reward } else { 0 };
        let completed_at = if analytics.completed { Some(Utc::now()) } else { None };

        store::upsert_lesson_progress(&mut *tx, user_id, lesson.id, xp_earned, completed_at)
            .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit submission for user {}: {:?}", user_id, e);
            AppError::InternalServerError(e.to_string())
        })?;
        recorded = true;
    }

    Ok(Json(GradeResponse {
        correct: outcome.result.correct,
        total: outcome.result.total,
        stars: outcome.result.stars,
        recorded,
    }))
}

// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    grading,
    models::{
        lesson::LessonIdent,
        progress::{
            LeaderboardEntry, LessonAnalytics, LessonProgressSummary, ProgressOverview,
            RecordAttemptRequest,
        },
        submission::LessonResult,
    },
    store,
    utils::jwt::Claims,
};

/// Aggregated analytics for one lesson, derived from the caller's attempt
/// history. Anonymous callers get zero-valued analytics instead of a 401,
/// so clients can render the lesson page without a session.
pub async fn lesson_progress(
    State(pool): State<PgPool>,
    Path(ident): Path<String>,
    claims: Option<Extension<Claims>>,
) -> Result<impl IntoResponse, AppError> {
    let ident = LessonIdent::from(ident);

    let lesson = store::fetch_lesson(&pool, &ident)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    let Some(Extension(claims)) = claims else {
        return Ok(Json(LessonAnalytics::empty(lesson.id)));
    };
    let user_id = claims.user_id();

    let exercises = store::fetch_lesson_exercises(&pool, lesson.id).await?;
    let history = store::fetch_attempt_history(&pool, user_id, lesson.id).await?;

    Ok(Json(grading::aggregate(&lesson, &exercises, &history)))
}

/// Records a self-reported attempt on a client-evaluated exercise (the
/// alphabet-teaching kinds run entirely on the client).
pub async fn record_attempt(
    State(pool): State<PgPool>,
    Path(exercise_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RecordAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exercise = store::fetch_exercise(&pool, exercise_id)
        .await?
        .ok_or(AppError::NotFound("Exercise not found".to_string()))?;

    store::insert_attempt(&pool, claims.user_id(), exercise.id, req.correct).await?;

    Ok(StatusCode::CREATED)
}

/// Past graded submissions of this lesson, newest first. Anonymous callers
/// get an empty history.
pub async fn lesson_results(
    State(pool): State<PgPool>,
    Path(ident): Path<String>,
    claims: Option<Extension<Claims>>,
) -> Result<impl IntoResponse, AppError> {
    let ident = LessonIdent::from(ident);

    let lesson = store::fetch_lesson(&pool, &ident)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    let Some(Extension(claims)) = claims else {
        return Ok(Json(Vec::<LessonResult>::new()));
    };

    let results = sqlx::query_as::<_, LessonResult>(
        r#"
        SELECT id, user_id, lesson_id, correct, total, stars, created_at
        FROM lesson_results
        WHERE user_id = $1 AND lesson_id = $2
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(claims.user_id())
    .bind(lesson.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// Per-user progress overview: total XP and one line per lesson.
/// Anonymous callers get a zero-valued overview instead of a 401.
pub async fn overview(
    State(pool): State<PgPool>,
    claims: Option<Extension<Claims>>,
) -> Result<impl IntoResponse, AppError> {
    let Some(Extension(claims)) = claims else {
        return Ok(Json(ProgressOverview {
            total_xp: 0,
            lessons_completed: 0,
            lessons: Vec::new(),
        }));
    };
    let user_id = claims.user_id();

    let lessons = sqlx::query_as::<_, LessonProgressSummary>(
        r#"
        SELECT
            l.id AS lesson_id,
            l.slug,
            l.title,
            COALESCE(p.xp_earned, 0) AS xp_earned,
            (p.completed_at IS NOT NULL) AS completed,
            COALESCE(r.best_stars, 0) AS best_stars
        FROM lessons l
        LEFT JOIN lesson_progress p ON p.lesson_id = l.id AND p.user_id = $1
        LEFT JOIN (
            SELECT lesson_id, MAX(stars) AS best_stars
            FROM lesson_results
            WHERE user_id = $1
            GROUP BY lesson_id
        ) r ON r.lesson_id = l.id
        ORDER BY l.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch progress overview: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total_xp: i64 = lessons.iter().map(|l| l.xp_earned as i64).sum();
    let lessons_completed = lessons.iter().filter(|l| l.completed).count() as i64;

    Ok(Json(ProgressOverview {
        total_xp,
        lessons_completed,
        lessons,
    }))
}

/// Retrieves the top 10 learners by total earned XP.
pub async fn get_leaderboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT
            u.username,
            COALESCE(SUM(p.xp_earned), 0)::BIGINT AS total_xp,
            COUNT(p.lesson_id) FILTER (WHERE p.completed_at IS NOT NULL) AS lessons_completed
        FROM users u
        JOIN lesson_progress p ON p.user_id = u.id
        GROUP BY u.id, u.username
        ORDER BY total_xp DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}

// src/store.rs
//
// Query/command layer over Postgres. The grading core never touches the
// database; everything it consumes comes through here, and everything it
// returns is persisted through here under the caller's transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::{
    exercise::{CreateExerciseRequest, Exercise, ExerciseOption, ExerciseWithOptions},
    lesson::{Lesson, LessonIdent, LessonSummary},
    progress::AttemptRecord,
    submission::GradeResult,
};

const EXERCISE_COLUMNS: &str = "id, lesson_id, kind, position, prompt, expected_answer, \
     case_sensitive, sentence_prefix, sentence_suffix, xp_weight, config, created_at";

/// Fetches a lesson by numeric id or slug.
pub async fn fetch_lesson(
    pool: &PgPool,
    ident: &LessonIdent,
) -> Result<Option<Lesson>, sqlx::Error> {
    let (id, slug) = match ident {
        LessonIdent::Id(id) => (Some(*id), None),
        LessonIdent::Slug(slug) => (None, Some(slug.as_str())),
    };

    sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, slug, title, description, level, xp_reward, created_at
        FROM lessons
        WHERE ($1::BIGINT IS NULL OR id = $1)
          AND ($2::TEXT IS NULL OR slug = $2)
        "#,
    )
    .bind(id)
    .bind(slug)
    .fetch_optional(pool)
    .await
}

/// Lists all lessons with their exercise counts, in id order.
pub async fn list_lessons(pool: &PgPool) -> Result<Vec<LessonSummary>, sqlx::Error> {
    sqlx::query_as::<_, LessonSummary>(
        r#"
        SELECT l.id, l.slug, l.title, l.level, l.xp_reward, COUNT(e.id) AS exercise_count
        FROM lessons l
        LEFT JOIN exercises e ON e.lesson_id = l.id
        GROUP BY l.id
        ORDER BY l.id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Fetches a lesson's exercises in presentation order.
pub async fn fetch_lesson_exercises(
    pool: &PgPool,
    lesson_id: i64,
) -> Result<Vec<Exercise>, sqlx::Error> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE lesson_id = $1 ORDER BY position"
    ))
    .bind(lesson_id)
    .fetch_all(pool)
    .await
}

/// Fetches one exercise by id.
pub async fn fetch_exercise(
    pool: &PgPool,
    exercise_id: i64,
) -> Result<Option<Exercise>, sqlx::Error> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1"
    ))
    .bind(exercise_id)
    .fetch_optional(pool)
    .await
}

/// Fetches the ordered options of one exercise.
pub async fn fetch_exercise_options(
    pool: &PgPool,
    exercise_id: i64,
) -> Result<Vec<ExerciseOption>, sqlx::Error> {
    sqlx::query_as::<_, ExerciseOption>(
        r#"
        SELECT id, exercise_id, text, is_correct, side, match_key, position
        FROM exercise_options
        WHERE exercise_id = $1
        ORDER BY position
        "#,
    )
    .bind(exercise_id)
    .fetch_all(pool)
    .await
}

/// Fetches the options of every exercise in a lesson with one query.
async fn fetch_options_for_lesson(
    pool: &PgPool,
    lesson_id: i64,
) -> Result<Vec<ExerciseOption>, sqlx::Error> {
    sqlx::query_as::<_, ExerciseOption>(
        r#"
        SELECT o.id, o.exercise_id, o.text, o.is_correct, o.side, o.match_key, o.position
        FROM exercise_options o
        JOIN exercises e ON e.id = o.exercise_id
        WHERE e.lesson_id = $1
        ORDER BY o.exercise_id, o.position
        "#,
    )
    .bind(lesson_id)
    .fetch_all(pool)
    .await
}

/// Fetches a lesson together with its exercises and their options.
pub async fn fetch_lesson_with_exercises(
    pool: &PgPool,
    ident: &LessonIdent,
) -> Result<Option<(Lesson, Vec<ExerciseWithOptions>)>, sqlx::Error> {
    let Some(lesson) = fetch_lesson(pool, ident).await? else {
        return Ok(None);
    };

    let exercises = fetch_lesson_exercises(pool, lesson.id).await?;
    let mut options_by_exercise: HashMap<i64, Vec<ExerciseOption>> = HashMap::new();
    for option in fetch_options_for_lesson(pool, lesson.id).await? {
        options_by_exercise
            .entry(option.exercise_id)
            .or_default()
            .push(option);
    }

    let combined = exercises
        .into_iter()
        .map(|exercise| {
            let options = options_by_exercise.remove(&exercise.id).unwrap_or_default();
            ExerciseWithOptions { exercise, options }
        })
        .collect();

    Ok(Some((lesson, combined)))
}

/// Inserts one exercise and its options. Callers have already validated
/// and sanitized the request; runs inside the caller's transaction.
pub async fn insert_exercise(
    conn: &mut PgConnection,
    lesson_id: i64,
    req: &CreateExerciseRequest,
) -> Result<i64, sqlx::Error> {
    let exercise_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exercises
            (lesson_id, kind, position, prompt, expected_answer, case_sensitive,
             sentence_prefix, sentence_suffix, xp_weight, config)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(lesson_id)
    .bind(req.kind.as_tag())
    .bind(req.position)
    .bind(&req.prompt)
    .bind(&req.expected_answer)
    .bind(req.case_sensitive)
    .bind(&req.sentence_prefix)
    .bind(&req.sentence_suffix)
    .bind(req.xp_weight)
    .bind(req.config.as_ref().map(sqlx::types::Json))
    .fetch_one(&mut *conn)
    .await?;

    for option in &req.options {
        sqlx::query(
            r#"
            INSERT INTO exercise_options
                (exercise_id, text, is_correct, side, match_key, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(exercise_id)
        .bind(&option.text)
        .bind(option.is_correct)
        .bind(&option.side)
        .bind(&option.match_key)
        .bind(option.position)
        .execute(&mut *conn)
        .await?;
    }

    Ok(exercise_id)
}

/// Appends one graded result row. Append-only: resubmission creates a new
/// history row rather than overwriting.
pub async fn append_lesson_result<'e>(
    executor: impl PgExecutor<'e>,
    user_id: i64,
    lesson_id: i64,
    result: &GradeResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO lesson_results (user_id, lesson_id, correct, total, stars)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(result.correct)
    .bind(result.total)
    .bind(result.stars)
    .execute(executor)
    .await?;
    Ok(())
}

/// Records one attempt of one exercise.
pub async fn insert_attempt<'e>(
    executor: impl PgExecutor<'e>,
    user_id: i64,
    exercise_id: i64,
    correct: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO exercise_attempts (user_id, exercise_id, correct)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(correct)
    .execute(executor)
    .await?;
    Ok(())
}

/// Fetches a user's full attempt history for one lesson, oldest first.
pub async fn fetch_attempt_history<'e>(
    executor: impl PgExecutor<'e>,
    user_id: i64,
    lesson_id: i64,
) -> Result<Vec<AttemptRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttemptRecord>(
        r#"
        SELECT a.id, a.user_id, a.exercise_id, a.correct, a.created_at
        FROM exercise_attempts a
        JOIN exercises e ON e.id = a.exercise_id
        WHERE a.user_id = $1 AND e.lesson_id = $2
        ORDER BY a.created_at, a.id
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_all(executor)
    .await
}

/// Upserts the aggregate progress row for a user+lesson pair. Idempotent on
/// the (user_id, lesson_id) key: re-running with the same inputs leaves the
/// same row.
pub async fn upsert_lesson_progress<'e>(
    executor: impl PgExecutor<'e>,
    user_id: i64,
    lesson_id: i64,
    xp_earned: i32,
    completed_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO lesson_progress (user_id, lesson_id, xp_earned, completed_at, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (user_id, lesson_id) DO UPDATE SET
            xp_earned = EXCLUDED.xp_earned,
            completed_at = COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at),
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(xp_earned)
    .bind(completed_at)
    .execute(executor)
    .await?;
    Ok(())
}

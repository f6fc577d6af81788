// src/grading/aggregator.rs

use std::collections::HashMap;

use crate::models::{
    exercise::Exercise,
    lesson::Lesson,
    progress::{AttemptRecord, ExerciseStats, LessonAnalytics},
};

/// Reduces a user's attempt history for one lesson into per-exercise stats
/// and lesson-level completion, stars, and earned XP. Pure function: same
/// history in, same analytics out.
pub fn aggregate(
    lesson: &Lesson,
    exercises: &[Exercise],
    history: &[AttemptRecord],
) -> LessonAnalytics {
    let mut by_exercise: HashMap<i64, Vec<&AttemptRecord>> = HashMap::new();
    for record in history {
        by_exercise.entry(record.exercise_id).or_default().push(record);
    }

    let mut stats = Vec::with_capacity(exercises.len());
    let mut completed_exercises = 0i64;
    let mut xp_earned = 0i32;

    for exercise in exercises {
        let attempts = by_exercise.get(&exercise.id).map_or(&[][..], |v| &v[..]);

        let attempt_count = attempts.len() as i64;
        let correct = attempts.iter().filter(|a| a.correct).count() as i64;
        let wrong = attempt_count - correct;
        let completed = correct > 0;
        let accuracy = if attempt_count == 0 {
            0.0
        } else {
            round2(correct as f64 / attempt_count as f64 * 100.0)
        };
        let last_attempt_at = attempts.iter().map(|a| a.created_at).max();

        if completed {
            completed_exercises += 1;
            xp_earned += exercise.xp_weight;
        }

        stats.push(ExerciseStats {
            exercise_id: exercise.id,
            attempts: attempt_count,
            correct,
            wrong,
            accuracy,
            last_attempt_at,
            completed,
        });
    }

    let total = exercises.len() as i64;
    let completion_ratio = if total == 0 {
        0.0
    } else {
        completed_exercises as f64 / total as f64
    };

    LessonAnalytics {
        lesson_id: lesson.id,
        total_exercises: total,
        completed_exercises,
        completion_ratio,
        completed: completion_ratio >= 0.70,
        stars: stars_for_ratio(completion_ratio),
        xp_earned,
        exercises: stats,
    }
}

/// Star rating as a step function of the completion ratio. Distinct from
/// the count-based scale used at submission time.
pub fn stars_for_ratio(ratio: f64) -> i32 {
    if ratio >= 1.0 {
        3
    } else if ratio >= 0.85 {
        2
    } else if ratio >= 0.70 {
        1
    } else {
        0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn lesson() -> Lesson {
        Lesson {
            id: 1,
            slug: "alphabet-1".to_string(),
            title: "The first letters".to_string(),
            description: None,
            level: 1,
            xp_reward: 50,
            created_at: Utc::now(),
        }
    }

    fn exercise(id: i64) -> Exercise {
        Exercise {
            id,
            lesson_id: 1,
            kind: "char_type_translit".to_string(),
            position: id as i32,
            prompt: format!("prompt {id}"),
            expected_answer: None,
            case_sensitive: false,
            sentence_prefix: None,
            sentence_suffix: None,
            xp_weight: 10,
            config: None,
            created_at: Utc::now(),
        }
    }

    fn attempt(id: i64, exercise_id: i64, correct: bool) -> AttemptRecord {
        AttemptRecord {
            id,
            user_id: 1,
            exercise_id,
            correct,
            created_at: Utc::now() + Duration::seconds(id),
        }
    }

    /// One correct attempt on each of the first `n` exercises.
    fn completed_history(n: i64) -> Vec<AttemptRecord> {
        (1..=n).map(|i| attempt(i, i, true)).collect()
    }

    #[test]
    fn ratio_star_thresholds() {
        let lesson = lesson();
        let exercises: Vec<_> = (1..=10).map(exercise).collect();

        // 7/10 -> exactly 0.70: completed, but only 1 star.
        let analytics = aggregate(&lesson, &exercises, &completed_history(7));
        assert_eq!(analytics.completion_ratio, 0.70);
        assert!(analytics.completed);
        assert_eq!(analytics.stars, 1);

        // 8/10 -> 0.80: still 1 star.
        let analytics = aggregate(&lesson, &exercises, &completed_history(8));
        assert_eq!(analytics.stars, 1);

        // 9/10 -> 0.90: 2 stars.
        let analytics = aggregate(&lesson, &exercises, &completed_history(9));
        assert_eq!(analytics.stars, 2);

        // 10/10 -> 3 stars.
        let analytics = aggregate(&lesson, &exercises, &completed_history(10));
        assert_eq!(analytics.stars, 3);
    }

    #[test]
    fn below_seventy_percent_is_not_completed() {
        let lesson = lesson();
        let exercises: Vec<_> = (1..=10).map(exercise).collect();
        let analytics = aggregate(&lesson, &exercises, &completed_history(6));
        assert!(!analytics.completed);
        assert_eq!(analytics.stars, 0);
    }

    #[test]
    fn empty_lesson_never_divides_by_zero() {
        let analytics = aggregate(&lesson(), &[], &[]);
        assert_eq!(analytics.completion_ratio, 0.0);
        assert_eq!(analytics.stars, 0);
        assert!(!analytics.completed);
        assert_eq!(analytics.xp_earned, 0);
    }

    #[test]
    fn accuracy_is_rounded_to_two_decimals() {
        let lesson = lesson();
        let exercises = vec![exercise(1)];
        // 1 correct of 3 attempts -> 33.333...% -> 33.33.
        let history = vec![
            attempt(1, 1, false),
            attempt(2, 1, false),
            attempt(3, 1, true),
        ];
        let analytics = aggregate(&lesson, &exercises, &history);
        let stats = &analytics.exercises[0];
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.correct, 1);
        assert_eq!(stats.wrong, 2);
        assert_eq!(stats.accuracy, 33.33);
        assert!(stats.completed);
    }

    #[test]
    fn unattempted_exercise_has_zero_accuracy() {
        let lesson = lesson();
        let exercises = vec![exercise(1), exercise(2)];
        let history = vec![attempt(1, 1, true)];
        let analytics = aggregate(&lesson, &exercises, &history);
        let untouched = &analytics.exercises[1];
        assert_eq!(untouched.attempts, 0);
        assert_eq!(untouched.accuracy, 0.0);
        assert_eq!(untouched.last_attempt_at, None);
        assert!(!untouched.completed);
    }

    #[test]
    fn xp_sums_only_completed_exercises() {
        let lesson = lesson();
        let mut exercises = vec![exercise(1), exercise(2), exercise(3)];
        exercises[2].xp_weight = 25;
        // Exercise 1 completed, 2 attempted but never correct, 3 completed.
        let history = vec![
            attempt(1, 1, true),
            attempt(2, 2, false),
            attempt(3, 3, true),
        ];
        let analytics = aggregate(&lesson, &exercises, &history);
        assert_eq!(analytics.xp_earned, 35);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let lesson = lesson();
        let exercises: Vec<_> = (1..=5).map(exercise).collect();
        let history = vec![
            attempt(1, 1, true),
            attempt(2, 2, false),
            attempt(3, 2, true),
            attempt(4, 99, true), // attempt on an exercise outside the lesson
        ];

        let first = aggregate(&lesson, &exercises, &history);
        let second = aggregate(&lesson, &exercises, &history);

        assert_eq!(first.completed_exercises, second.completed_exercises);
        assert_eq!(first.completion_ratio, second.completion_ratio);
        assert_eq!(first.stars, second.stars);
        assert_eq!(first.xp_earned, second.xp_earned);
        assert_eq!(first.exercises.len(), second.exercises.len());
    }

    #[test]
    fn history_rows_for_foreign_exercises_are_ignored() {
        let lesson = lesson();
        let exercises = vec![exercise(1)];
        let history = vec![attempt(1, 42, true)];
        let analytics = aggregate(&lesson, &exercises, &history);
        assert_eq!(analytics.completed_exercises, 0);
        assert_eq!(analytics.xp_earned, 0);
    }
}

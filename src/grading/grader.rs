// src/grading/grader.rs

use std::collections::HashSet;

use crate::grading::evaluator::{Verdict, evaluate};
use crate::models::{
    exercise::ExerciseWithOptions,
    submission::{GradeResult, SubmittedAnswer},
};

/// Grade outcome: the learner-facing result plus the per-exercise verdicts
/// the caller needs to persist attempt history.
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub result: GradeResult,
    /// (exercise_id, verdict) for every evaluated answer, in submission order.
    pub verdicts: Vec<(i64, Verdict)>,
}

/// Grades a submission batch against a lesson's exercises.
///
/// The denominator is the number of exercises in the lesson, so an
/// unattempted exercise still counts toward the total. Answers referencing
/// an exercise id outside the lesson are silently dropped, and each
/// exercise is evaluated at most once (first answer wins).
pub fn grade(exercises: &[ExerciseWithOptions], answers: &[SubmittedAnswer]) -> GradeOutcome {
    let total = exercises.len() as i32;

    let mut correct = 0;
    let mut seen: HashSet<i64> = HashSet::new();
    let mut verdicts = Vec::new();

    for answer in answers {
        let Some(target) = exercises
            .iter()
            .find(|e| e.exercise.id == answer.exercise_id)
        else {
            // Stale client state; ignore and continue.
            continue;
        };
        if !seen.insert(answer.exercise_id) {
            continue;
        }

        let verdict = evaluate(&target.exercise, &target.options, &answer.payload);
        if verdict == Verdict::Correct {
            correct += 1;
        }
        verdicts.push((answer.exercise_id, verdict));
    }

    GradeOutcome {
        result: GradeResult {
            correct,
            total,
            stars: stars_for_correct(correct),
        },
        verdicts,
    }
}

/// Star rating as a fixed step function of the correct count.
/// Deliberately lesson-size-agnostic; the history aggregator uses a
/// separate ratio-based scale.
pub fn stars_for_correct(correct: i32) -> i32 {
    match correct {
        i32::MIN..=0 => 0,
        1..=2 => 1,
        3..=4 => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::{Exercise, ExerciseWithOptions};
    use crate::models::submission::AnswerPayload;

    fn text_exercise(id: i64, expected: &str) -> ExerciseWithOptions {
        ExerciseWithOptions {
            exercise: Exercise {
                id,
                lesson_id: 1,
                kind: "type-answer".to_string(),
                position: id as i32,
                prompt: format!("prompt {id}"),
                expected_answer: Some(expected.to_string()),
                case_sensitive: false,
                sentence_prefix: None,
                sentence_suffix: None,
                xp_weight: 10,
                config: None,
                created_at: chrono::Utc::now(),
            },
            options: vec![],
        }
    }

    fn answer(id: i64, text: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            exercise_id: id,
            payload: AnswerPayload::Text { text: text.to_string() },
        }
    }

    fn lesson_of(n: i64) -> Vec<ExerciseWithOptions> {
        (1..=n).map(|i| text_exercise(i, "ok")).collect()
    }

    #[test]
    fn stars_step_on_correct_count() {
        assert_eq!(stars_for_correct(0), 0);
        assert_eq!(stars_for_correct(1), 1);
        assert_eq!(stars_for_correct(2), 1);
        assert_eq!(stars_for_correct(3), 2);
        assert_eq!(stars_for_correct(4), 2);
        assert_eq!(stars_for_correct(5), 3);
        assert_eq!(stars_for_correct(7), 3);
    }

    #[test]
    fn star_thresholds_for_a_seven_exercise_lesson() {
        let exercises = lesson_of(7);

        for (n_correct, expected_stars) in [(0, 0), (2, 1), (4, 2), (7, 3)] {
            let answers: Vec<_> = (1..=7)
                .map(|i| answer(i, if i <= n_correct { "ok" } else { "nope" }))
                .collect();
            let outcome = grade(&exercises, &answers);
            assert_eq!(outcome.result.correct, n_correct as i32);
            assert_eq!(outcome.result.total, 7);
            assert_eq!(outcome.result.stars, expected_stars, "correct={n_correct}");
        }
    }

    #[test]
    fn unattempted_exercises_still_count_toward_total() {
        let exercises = lesson_of(5);
        let outcome = grade(&exercises, &[answer(1, "ok")]);
        assert_eq!(outcome.result.correct, 1);
        assert_eq!(outcome.result.total, 5);
    }

    #[test]
    fn unknown_exercise_ids_are_dropped() {
        let exercises = lesson_of(2);
        let outcome = grade(&exercises, &[answer(1, "ok"), answer(99, "ok")]);
        assert_eq!(outcome.result.correct, 1);
        assert_eq!(outcome.result.total, 2);
        assert_eq!(outcome.verdicts.len(), 1);
    }

    #[test]
    fn duplicate_answers_count_once() {
        let exercises = lesson_of(1);
        let outcome = grade(&exercises, &[answer(1, "ok"), answer(1, "ok")]);
        assert_eq!(outcome.result.correct, 1);
        assert_eq!(outcome.verdicts.len(), 1);
    }

    #[test]
    fn empty_submission_grades_to_zero() {
        let exercises = lesson_of(3);
        let outcome = grade(&exercises, &[]);
        assert_eq!(outcome.result.correct, 0);
        assert_eq!(outcome.result.total, 3);
        assert_eq!(outcome.result.stars, 0);
    }
}

// src/grading/evaluator.rs

use std::collections::BTreeSet;

use crate::models::{
    exercise::{Exercise, ExerciseKind, ExerciseOption},
    submission::{AnswerPayload, MatchPair},
};

/// Outcome of evaluating a single answer against a single exercise.
///
/// `Skipped` means the answer does not count as an attempt at all: empty
/// matching submissions, presentation-only kinds, and kind tags this build
/// does not recognize. Skipped is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    Skipped,
}

/// Decides correctness of one submitted answer under the exercise's
/// kind-specific rule. Pure function, no I/O.
pub fn evaluate(
    exercise: &Exercise,
    options: &[ExerciseOption],
    payload: &AnswerPayload,
) -> Verdict {
    let Some(kind) = ExerciseKind::from_tag(&exercise.kind) else {
        // Unknown tag: tolerate client/server version skew.
        return Verdict::Skipped;
    };

    match kind {
        ExerciseKind::TypeAnswer | ExerciseKind::FillBlank => match payload {
            AnswerPayload::Text { text } => evaluate_text(exercise, text),
            // Wrong payload shape for the kind fails closed.
            _ => Verdict::Incorrect,
        },
        ExerciseKind::MultiSelect => match payload {
            AnswerPayload::Selection { option_ids } => evaluate_multi_select(options, option_ids),
            _ => Verdict::Incorrect,
        },
        ExerciseKind::Matching => match payload {
            AnswerPayload::Pairs { pairs } => evaluate_matching(options, pairs),
            _ => Verdict::Incorrect,
        },
        // Presentation-only kinds are excluded from server-side scoring.
        _ => Verdict::Skipped,
    }
}

/// Trim both sides, lowercase both unless the exercise is case-sensitive,
/// then require exact equality. No fuzzy matching, no diacritic folding.
fn evaluate_text(exercise: &Exercise, submitted: &str) -> Verdict {
    let Some(expected) = exercise.expected_answer.as_deref() else {
        // An answerable text exercise without an answer key cannot be
        // scored; fail closed.
        return Verdict::Incorrect;
    };

    let submitted = normalize(submitted, exercise.case_sensitive);
    let expected = normalize(expected, exercise.case_sensitive);

    if submitted == expected {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

fn normalize(text: &str, case_sensitive: bool) -> String {
    let trimmed = text.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// The selected id set must equal the correct id set exactly. Order is
/// irrelevant and duplicates collapse under set semantics.
fn evaluate_multi_select(options: &[ExerciseOption], selected: &[i64]) -> Verdict {
    let correct: BTreeSet<i64> = options
        .iter()
        .filter(|o| o.is_correct == Some(true))
        .map(|o| o.id)
        .collect();
    let selected: BTreeSet<i64> = selected.iter().copied().collect();

    if selected == correct {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

/// An empty pair list is not an attempt. Otherwise every pair must
/// reference options of this exercise and join two options carrying the
/// same match key; one bad pair fails the whole exercise.
fn evaluate_matching(options: &[ExerciseOption], pairs: &[MatchPair]) -> Verdict {
    if pairs.is_empty() {
        return Verdict::Skipped;
    }

    for pair in pairs {
        let left = options.iter().find(|o| o.id == pair.left_id);
        let right = options.iter().find(|o| o.id == pair.right_id);

        let (Some(left), Some(right)) = (left, right) else {
            return Verdict::Incorrect;
        };

        match (&left.match_key, &right.match_key) {
            (Some(l), Some(r)) if l == r => {}
            _ => return Verdict::Incorrect,
        }
    }

    Verdict::Correct
}

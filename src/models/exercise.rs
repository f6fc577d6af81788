// src/models/exercise.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use utoipa::ToSchema;
use validator::Validate;

/// Option side markers for matching exercises.
pub const SIDE_LEFT: &str = "left";
pub const SIDE_RIGHT: &str = "right";

/// Exercise kind tag. Selects the grading rule and the expected shape of
/// the `config` payload.
///
/// The four scored kinds keep their historical kebab-case tags; the
/// alphabet-teaching family uses snake_case. Both spellings are wire format
/// and must not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ExerciseKind {
    #[serde(rename = "type-answer")]
    TypeAnswer,
    #[serde(rename = "fill-blank")]
    FillBlank,
    #[serde(rename = "multi-select")]
    MultiSelect,
    #[serde(rename = "matching")]
    Matching,
    #[serde(rename = "char_intro")]
    CharIntro,
    #[serde(rename = "char_mcq_sound")]
    CharMcqSound,
    #[serde(rename = "char_build_word")]
    CharBuildWord,
    #[serde(rename = "char_listen_build")]
    CharListenBuild,
    #[serde(rename = "char_find_in_grid")]
    CharFindInGrid,
    #[serde(rename = "char_type_translit")]
    CharTypeTranslit,
}

impl ExerciseKind {
    /// Parses a kind tag. Returns `None` for tags this build does not know,
    /// which callers treat as ignore-and-continue (client/server skew).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "type-answer" => Some(Self::TypeAnswer),
            "fill-blank" => Some(Self::FillBlank),
            "multi-select" => Some(Self::MultiSelect),
            "matching" => Some(Self::Matching),
            "char_intro" => Some(Self::CharIntro),
            "char_mcq_sound" => Some(Self::CharMcqSound),
            "char_build_word" => Some(Self::CharBuildWord),
            "char_listen_build" => Some(Self::CharListenBuild),
            "char_find_in_grid" => Some(Self::CharFindInGrid),
            "char_type_translit" => Some(Self::CharTypeTranslit),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::TypeAnswer => "type-answer",
            Self::FillBlank => "fill-blank",
            Self::MultiSelect => "multi-select",
            Self::Matching => "matching",
            Self::CharIntro => "char_intro",
            Self::CharMcqSound => "char_mcq_sound",
            Self::CharBuildWord => "char_build_word",
            Self::CharListenBuild => "char_listen_build",
            Self::CharFindInGrid => "char_find_in_grid",
            Self::CharTypeTranslit => "char_type_translit",
        }
    }

    /// Whether the server grades this kind. The alphabet-teaching kinds are
    /// presentation-only: the client runs them and self-reports attempts.
    pub fn is_scored(self) -> bool {
        matches!(
            self,
            Self::TypeAnswer | Self::FillBlank | Self::MultiSelect | Self::Matching
        )
    }
}

/// Represents the 'exercises' table in the database.
///
/// `kind` stays a raw string on the row so that rows written by a newer
/// authoring tool never fail to load; parse with `ExerciseKind::from_tag`
/// where the tag matters.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub lesson_id: i64,

    /// Kind tag, see `ExerciseKind`.
    pub kind: String,

    /// Presentation order. Unique within a lesson.
    pub position: i32,

    pub prompt: String,

    /// Expected answer for 'type-answer' / 'fill-blank'.
    pub expected_answer: Option<String>,

    /// When false, text answers are compared after Unicode lowercasing.
    pub case_sensitive: bool,

    /// Sentence fragments surrounding the blank in 'fill-blank'.
    pub sentence_prefix: Option<String>,
    pub sentence_suffix: Option<String>,

    /// XP contributed to the lesson total once this exercise is completed.
    pub xp_weight: i32,

    /// Kind-specific payload. Stored as JSONB; kept opaque on reads so
    /// unknown future shapes pass through, validated as `ExerciseConfig`
    /// on writes.
    pub config: Option<Json<serde_json::Value>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'exercise_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExerciseOption {
    pub id: i64,
    pub exercise_id: i64,

    pub text: String,

    /// Marks a correct choice for 'multi-select'.
    pub is_correct: Option<bool>,

    /// 'left' or 'right' for 'matching'.
    pub side: Option<String>,

    /// Token pairing a left option with its right counterpart.
    pub match_key: Option<String>,

    pub position: i32,
}

/// An exercise together with its options, the unit the grader consumes.
#[derive(Debug, Clone)]
pub struct ExerciseWithOptions {
    pub exercise: Exercise,
    pub options: Vec<ExerciseOption>,
}

/// DTO for sending an exercise to learners.
/// Excludes `expected_answer`, `is_correct` and `match_key`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicExercise {
    pub id: i64,
    pub kind: String,
    pub position: i32,
    pub prompt: String,
    pub case_sensitive: bool,
    pub sentence_prefix: Option<String>,
    pub sentence_suffix: Option<String>,
    pub xp_weight: i32,
    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
    pub options: Vec<PublicOption>,
}

/// DTO for an option as shown to learners.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
    pub side: Option<String>,
    pub position: i32,
}

impl PublicExercise {
    pub fn from_parts(exercise: Exercise, options: Vec<ExerciseOption>) -> Self {
        Self {
            id: exercise.id,
            kind: exercise.kind,
            position: exercise.position,
            prompt: exercise.prompt,
            case_sensitive: exercise.case_sensitive,
            sentence_prefix: exercise.sentence_prefix,
            sentence_suffix: exercise.sentence_suffix,
            xp_weight: exercise.xp_weight,
            config: exercise.config.map(|c| c.0),
            options: options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                    side: o.side,
                    position: o.position,
                })
                .collect(),
        }
    }
}

/// An example word shown alongside a newly introduced letter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleWord {
    pub word: String,
    pub translit: String,
    pub meaning: String,
}

/// Kind-specific configuration payload, one variant per alphabet-teaching
/// kind. The embedded `kind` tag must agree with the exercise's kind tag;
/// authoring rejects mismatches. Scored kinds carry no config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExerciseConfig {
    #[serde(rename = "char_intro")]
    CharIntro {
        letter: String,
        translit: String,
        #[serde(default)]
        audio_text: Option<String>,
        #[serde(default)]
        example_words: Vec<ExampleWord>,
    },
    #[serde(rename = "char_mcq_sound")]
    CharMcqSound {
        letter: String,
        audio_text: String,
        choices: Vec<String>,
        correct_index: usize,
    },
    #[serde(rename = "char_build_word")]
    CharBuildWord {
        word: String,
        translit: String,
        meaning: String,
        letter_bank: Vec<String>,
    },
    #[serde(rename = "char_listen_build")]
    CharListenBuild {
        word: String,
        audio_text: String,
        letter_bank: Vec<String>,
    },
    #[serde(rename = "char_find_in_grid")]
    CharFindInGrid {
        target: String,
        grid_rows: Vec<String>,
        target_count: u32,
    },
    #[serde(rename = "char_type_translit")]
    CharTypeTranslit {
        letter: String,
        accepted: Vec<String>,
    },
}

impl ExerciseConfig {
    pub fn kind(&self) -> ExerciseKind {
        match self {
            Self::CharIntro { .. } => ExerciseKind::CharIntro,
            Self::CharMcqSound { .. } => ExerciseKind::CharMcqSound,
            Self::CharBuildWord { .. } => ExerciseKind::CharBuildWord,
            Self::CharListenBuild { .. } => ExerciseKind::CharListenBuild,
            Self::CharFindInGrid { .. } => ExerciseKind::CharFindInGrid,
            Self::CharTypeTranslit { .. } => ExerciseKind::CharTypeTranslit,
        }
    }
}

/// DTO for creating an option within an exercise.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    pub is_correct: Option<bool>,
    pub side: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub match_key: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// DTO for creating a new exercise (admin/CMS).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExerciseRequest {
    pub kind: ExerciseKind,
    pub position: i32,
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    #[validate(length(max = 500))]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[validate(length(max = 500))]
    pub sentence_prefix: Option<String>,
    #[validate(length(max = 500))]
    pub sentence_suffix: Option<String>,
    #[serde(default = "default_xp_weight")]
    #[validate(range(min = 0, max = 1000))]
    pub xp_weight: i32,
    pub config: Option<ExerciseConfig>,
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<CreateOptionRequest>,
}

fn default_xp_weight() -> i32 {
    10
}

impl CreateExerciseRequest {
    /// Cross-field checks that `validator` cannot express: config/kind
    /// agreement and the matching pairing invariant.
    pub fn check_consistency(&self) -> Result<(), String> {
        match (&self.config, self.kind.is_scored()) {
            (Some(_), true) => {
                return Err(format!(
                    "'{}' exercises do not take a config payload",
                    self.kind.as_tag()
                ));
            }
            (Some(cfg), false) if cfg.kind() != self.kind => {
                return Err(format!(
                    "config payload is for '{}' but exercise kind is '{}'",
                    cfg.kind().as_tag(),
                    self.kind.as_tag()
                ));
            }
            (None, false) => {
                return Err(format!(
                    "'{}' exercises require a config payload",
                    self.kind.as_tag()
                ));
            }
            _ => {}
        }

        if self.kind == ExerciseKind::Matching {
            validate_matching_options(&self.options)?;
        }

        for opt in &self.options {
            if let Some(side) = &opt.side {
                if side != SIDE_LEFT && side != SIDE_RIGHT {
                    return Err(format!("invalid option side '{side}'"));
                }
            }
        }

        Ok(())
    }
}

/// For matching exercises: every left-side match key must have exactly one
/// right-side counterpart, and vice versa, or the exercise is unanswerable.
fn validate_matching_options(options: &[CreateOptionRequest]) -> Result<(), String> {
    use std::collections::HashMap;

    let mut left: HashMap<&str, u32> = HashMap::new();
    let mut right: HashMap<&str, u32> = HashMap::new();

    for opt in options {
        let key = opt
            .match_key
            .as_deref()
            .ok_or("matching options require a match_key")?;
        match opt.side.as_deref() {
            Some(SIDE_LEFT) => *left.entry(key).or_default() += 1,
            Some(SIDE_RIGHT) => *right.entry(key).or_default() += 1,
            _ => return Err("matching options require side 'left' or 'right'".to_string()),
        }
    }

    for (key, count) in &left {
        if *count != 1 || right.get(key) != Some(&1) {
            return Err(format!("match key '{key}' is not paired exactly once per side"));
        }
    }
    for key in right.keys() {
        if !left.contains_key(key) {
            return Err(format!("match key '{key}' has no left-side option"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(side: &str, key: &str) -> CreateOptionRequest {
        CreateOptionRequest {
            text: "x".to_string(),
            is_correct: None,
            side: Some(side.to_string()),
            match_key: Some(key.to_string()),
            position: 0,
        }
    }

    #[test]
    fn kind_tags_round_trip() {
        for tag in [
            "type-answer",
            "fill-blank",
            "multi-select",
            "matching",
            "char_intro",
            "char_mcq_sound",
            "char_build_word",
            "char_listen_build",
            "char_find_in_grid",
            "char_type_translit",
        ] {
            let kind = ExerciseKind::from_tag(tag).expect(tag);
            assert_eq!(kind.as_tag(), tag);
        }
        assert!(ExerciseKind::from_tag("char_hologram").is_none());
    }

    #[test]
    fn matching_options_must_pair_one_to_one() {
        assert!(validate_matching_options(&[opt("left", "a"), opt("right", "a")]).is_ok());

        // Left key without a right counterpart.
        assert!(validate_matching_options(&[opt("left", "a"), opt("right", "b")]).is_err());

        // Duplicate right side for one key.
        assert!(
            validate_matching_options(&[opt("left", "a"), opt("right", "a"), opt("right", "a")])
                .is_err()
        );

        // Right key never used on the left.
        assert!(
            validate_matching_options(&[
                opt("left", "a"),
                opt("right", "a"),
                opt("right", "b")
            ])
            .is_err()
        );
    }

    #[test]
    fn config_tag_must_agree_with_kind() {
        let req = CreateExerciseRequest {
            kind: ExerciseKind::CharIntro,
            position: 0,
            prompt: "Meet the letter".to_string(),
            expected_answer: None,
            case_sensitive: false,
            sentence_prefix: None,
            sentence_suffix: None,
            xp_weight: 10,
            config: Some(ExerciseConfig::CharTypeTranslit {
                letter: "Ա".to_string(),
                accepted: vec!["a".to_string()],
            }),
            options: vec![],
        };
        assert!(req.check_consistency().is_err());
    }

    #[test]
    fn scored_kind_rejects_config() {
        let req = CreateExerciseRequest {
            kind: ExerciseKind::TypeAnswer,
            position: 0,
            prompt: "Say hello".to_string(),
            expected_answer: Some("Բարև".to_string()),
            case_sensitive: false,
            sentence_prefix: None,
            sentence_suffix: None,
            xp_weight: 10,
            config: Some(ExerciseConfig::CharIntro {
                letter: "Ա".to_string(),
                translit: "a".to_string(),
                audio_text: None,
                example_words: vec![],
            }),
            options: vec![],
        };
        assert!(req.check_consistency().is_err());
    }
}

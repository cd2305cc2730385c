//! Core data model types for mockexam.
//!
//! These are the plain data types that flow through evaluation and
//! aggregation: question definitions, submitted responses, and the
//! per-question results derived from them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Marks awarded for a correct answer when neither the question nor the test sets one.
pub const DEFAULT_MARKS_CORRECT: f64 = 4.0;

/// Marks awarded for a wrong answer when neither the question nor the test sets one.
pub const DEFAULT_MARKS_WRONG: f64 = -1.0;

/// Difficulty key used when a question has no (or an empty) difficulty band.
pub const UNKNOWN_DIFFICULTY: &str = "unknown";

/// Chapter key used when a question has no chapter.
pub const OTHER_CHAPTER: &str = "Other";

/// The kind of answer a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Numerical,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::SingleChoice => write!(f, "single_choice"),
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::Numerical => write!(f, "numerical"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "single_choice" | "singlechoice" | "single" | "scq" => Ok(QuestionType::SingleChoice),
            "multiple_choice" | "multiplechoice" | "multiple" | "msq" => {
                Ok(QuestionType::MultipleChoice)
            }
            "numerical" | "numeric" | "integer" | "nat" => Ok(QuestionType::Numerical),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Inclusive numeric bounds. A missing bound never excludes a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Returns `true` if `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        let min = self.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.max.unwrap_or(f64::INFINITY);
        value >= min && value <= max
    }

    /// Returns `true` if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Partial-credit configuration for multiple-choice questions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialCredit {
    #[serde(default)]
    pub enabled: bool,
    /// Credit per correctly selected option.
    #[serde(default = "default_per_option_marks")]
    pub per_option_marks: f64,
}

impl Default for PartialCredit {
    fn default() -> Self {
        Self {
            enabled: false,
            per_option_marks: default_per_option_marks(),
        }
    }
}

fn default_per_option_marks() -> f64 {
    1.0
}

/// How a question decides correctness. Exactly one variant exists per
/// question, so the key always matches the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerKey {
    SingleChoice {
        /// 0-based index of the correct choice. `None` means nothing can match.
        #[serde(default)]
        answer_index: Option<u32>,
    },
    MultipleChoice {
        /// 0-based indices of the correct choices. Empty means nothing can match.
        #[serde(default)]
        answer_indices: BTreeSet<u32>,
        #[serde(default)]
        partial: PartialCredit,
    },
    Numerical {
        #[serde(default)]
        range: NumericRange,
    },
}

impl AnswerKey {
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerKey::SingleChoice { .. } => QuestionType::SingleChoice,
            AnswerKey::MultipleChoice { .. } => QuestionType::MultipleChoice,
            AnswerKey::Numerical { .. } => QuestionType::Numerical,
        }
    }
}

/// One assessable item of a mock test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Opaque stable identifier.
    pub id: String,
    pub key: AnswerKey,
    /// Overrides the test-level marks for a correct answer.
    #[serde(default)]
    pub marks_correct: Option<f64>,
    /// Overrides the test-level marks for a wrong answer.
    #[serde(default)]
    pub marks_wrong: Option<f64>,
    /// Free-form difficulty band, e.g. "easy" / "moderate" / "tough".
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub skill_tags: BTreeSet<String>,
}

impl Question {
    /// A question with the given key and no metadata.
    pub fn new(id: impl Into<String>, key: AnswerKey) -> Self {
        Self {
            id: id.into(),
            key,
            marks_correct: None,
            marks_wrong: None,
            difficulty: None,
            chapter: None,
            chapter_id: None,
            skill_tags: BTreeSet::new(),
        }
    }

    pub fn question_type(&self) -> QuestionType {
        self.key.question_type()
    }

    /// Difficulty band lowercased, or `"unknown"` if absent or blank.
    pub fn normalized_difficulty(&self) -> String {
        normalize_difficulty(self.difficulty.as_deref())
    }
}

pub(crate) fn normalize_difficulty(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_lowercase(),
        _ => UNKNOWN_DIFFICULTY.to_string(),
    }
}

/// Test-level marking defaults. Unset fields fall back to 4 / -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringDefaults {
    #[serde(default)]
    pub marks_correct: Option<f64>,
    #[serde(default)]
    pub marks_wrong: Option<f64>,
}

/// Effective marks for one question after resolving overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marks {
    pub correct: f64,
    pub wrong: f64,
}

impl ScoringDefaults {
    pub fn new(marks_correct: f64, marks_wrong: f64) -> Self {
        Self {
            marks_correct: Some(marks_correct),
            marks_wrong: Some(marks_wrong),
        }
    }

    /// Resolve `question ?? defaults ?? built-in` for both marks.
    pub fn resolve(&self, question: &Question) -> Marks {
        Marks {
            correct: question
                .marks_correct
                .or(self.marks_correct)
                .unwrap_or(DEFAULT_MARKS_CORRECT),
            wrong: question
                .marks_wrong
                .or(self.marks_wrong)
                .unwrap_or(DEFAULT_MARKS_WRONG),
        }
    }

    /// Layer `self` over `fallback`: fields set here win.
    pub fn or(self, fallback: ScoringDefaults) -> ScoringDefaults {
        ScoringDefaults {
            marks_correct: self.marks_correct.or(fallback.marks_correct),
            marks_wrong: self.marks_wrong.or(fallback.marks_wrong),
        }
    }
}

/// A raw numerical response as stored by the client: either a number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    /// Parse to a finite number. Blank, non-numeric and non-finite input yields `None`.
    pub fn parse(&self) -> Option<f64> {
        let value = match self {
            NumericInput::Number(n) => *n,
            NumericInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// A user's submitted answer to one question, tagged by question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    SingleChoice {
        #[serde(default)]
        choice_index: Option<u32>,
    },
    MultipleChoice {
        #[serde(default)]
        choice_indices: BTreeSet<u32>,
    },
    Numerical {
        #[serde(default)]
        value: Option<NumericInput>,
    },
}

impl Response {
    pub fn single(index: u32) -> Self {
        Response::SingleChoice {
            choice_index: Some(index),
        }
    }

    pub fn multiple(indices: impl IntoIterator<Item = u32>) -> Self {
        Response::MultipleChoice {
            choice_indices: indices.into_iter().collect(),
        }
    }

    pub fn numerical(value: impl Into<NumericInput>) -> Self {
        Response::Numerical {
            value: Some(value.into()),
        }
    }

    /// The unattempted response for a question type.
    pub fn empty(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::SingleChoice => Response::SingleChoice { choice_index: None },
            QuestionType::MultipleChoice => Response::MultipleChoice {
                choice_indices: BTreeSet::new(),
            },
            QuestionType::Numerical => Response::Numerical { value: None },
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            Response::SingleChoice { .. } => QuestionType::SingleChoice,
            Response::MultipleChoice { .. } => QuestionType::MultipleChoice,
            Response::Numerical { .. } => QuestionType::Numerical,
        }
    }

    /// Returns `true` if the type-specific field is absent, empty, or not a number.
    pub fn is_unattempted(&self) -> bool {
        match self {
            Response::SingleChoice { choice_index } => choice_index.is_none(),
            Response::MultipleChoice { choice_indices } => choice_indices.is_empty(),
            Response::Numerical { value } => value.as_ref().and_then(NumericInput::parse).is_none(),
        }
    }
}

impl From<f64> for NumericInput {
    fn from(n: f64) -> Self {
        NumericInput::Number(n)
    }
}

impl From<&str> for NumericInput {
    fn from(s: &str) -> Self {
        NumericInput::Text(s.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(s: String) -> Self {
        NumericInput::Text(s)
    }
}

/// Classification of one evaluated question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationResult {
    Correct,
    Incorrect,
    Partial,
    Unattempted,
}

impl EvaluationResult {
    pub fn is_attempted(self) -> bool {
        self != EvaluationResult::Unattempted
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationResult::Correct => write!(f, "correct"),
            EvaluationResult::Incorrect => write!(f, "incorrect"),
            EvaluationResult::Partial => write!(f, "partial"),
            EvaluationResult::Unattempted => write!(f, "unattempted"),
        }
    }
}

/// Outcome of evaluating one question, with the question's grouping
/// metadata copied in for downstream aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEvaluation {
    pub question_id: String,
    pub result: EvaluationResult,
    pub score: f64,
    pub time_sec: u64,
    /// Lowercased difficulty band, `"unknown"` if absent.
    pub difficulty: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub skill_tags: BTreeSet<String>,
}

/// A mock test: metadata, marking defaults and its ordered questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockTest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub defaults: ScoringDefaults,
    #[serde(default)]
    pub duration_mins: Option<u32>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

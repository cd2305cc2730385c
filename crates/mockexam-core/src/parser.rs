//! TOML question bank parser.
//!
//! Loads mock tests from TOML files and directories, and validates them.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::BankError;
use crate::model::{
    AnswerKey, MockTest, NumericRange, PartialCredit, Question, QuestionType, ScoringDefaults,
};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    test: TomlTestHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlTestHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    marks_correct: Option<f64>,
    #[serde(default)]
    marks_wrong: Option<f64>,
    #[serde(default)]
    duration_mins: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    question_type: String,
    #[serde(default)]
    answer_index: Option<u32>,
    #[serde(default)]
    answer_indices: Option<Vec<u32>>,
    #[serde(default)]
    range: Option<TomlRange>,
    #[serde(default)]
    marks_correct: Option<f64>,
    #[serde(default)]
    marks_wrong: Option<f64>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    chapter_id: Option<String>,
    #[serde(default)]
    skill_tags: Vec<String>,
    /// Older banks flag partial marking directly on the question.
    #[serde(default)]
    partial_marking: Option<bool>,
    #[serde(default)]
    scheme: Option<TomlScheme>,
}

#[derive(Debug, Deserialize)]
struct TomlRange {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TomlScheme {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    per_option_marks: Option<f64>,
}

/// Parse a single TOML file into a `MockTest`.
pub fn parse_mock_test(path: &Path) -> Result<MockTest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_mock_test_str(&content, path)
}

/// Parse a TOML string into a `MockTest` (useful for testing).
pub fn parse_mock_test_str(content: &str, source_path: &Path) -> Result<MockTest> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(parsed.questions.len());
    for q in parsed.questions {
        if !seen.insert(q.id.clone()) {
            return Err(BankError::DuplicateQuestionId(q.id))
                .with_context(|| format!("invalid question bank: {}", source_path.display()));
        }
        let question = build_question(q)
            .with_context(|| format!("invalid question bank: {}", source_path.display()))?;
        questions.push(question);
    }

    tracing::debug!(
        "parsed {} questions for test '{}' from {}",
        questions.len(),
        parsed.test.id,
        source_path.display()
    );

    Ok(MockTest {
        id: parsed.test.id,
        name: parsed.test.name,
        description: parsed.test.description,
        defaults: ScoringDefaults {
            marks_correct: parsed.test.marks_correct,
            marks_wrong: parsed.test.marks_wrong,
        },
        duration_mins: parsed.test.duration_mins,
        questions,
    })
}

fn build_question(q: TomlQuestion) -> Result<Question, BankError> {
    let question_type: QuestionType =
        q.question_type
            .parse()
            .map_err(|_| BankError::UnknownQuestionType {
                question_id: q.id.clone(),
                value: q.question_type.clone(),
            })?;

    let foreign = |field: &'static str| BankError::ForeignAnswerField {
        question_id: q.id.clone(),
        question_type: question_type.to_string(),
        field,
    };

    let key = match question_type {
        QuestionType::SingleChoice => {
            if q.answer_indices.is_some() {
                return Err(foreign("answer_indices"));
            }
            if q.range.is_some() {
                return Err(foreign("range"));
            }
            AnswerKey::SingleChoice {
                answer_index: q.answer_index,
            }
        }
        QuestionType::MultipleChoice => {
            if q.answer_index.is_some() {
                return Err(foreign("answer_index"));
            }
            if q.range.is_some() {
                return Err(foreign("range"));
            }
            AnswerKey::MultipleChoice {
                answer_indices: q.answer_indices.clone().unwrap_or_default().into_iter().collect(),
                partial: partial_credit(q.partial_marking, q.scheme.as_ref()),
            }
        }
        QuestionType::Numerical => {
            if q.answer_index.is_some() {
                return Err(foreign("answer_index"));
            }
            if q.answer_indices.is_some() {
                return Err(foreign("answer_indices"));
            }
            let range = q
                .range
                .as_ref()
                .map(|r| NumericRange {
                    min: r.min,
                    max: r.max,
                })
                .unwrap_or_default();
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(BankError::InvertedRange {
                        question_id: q.id.clone(),
                        min,
                        max,
                    });
                }
            }
            AnswerKey::Numerical { range }
        }
    };

    Ok(Question {
        id: q.id,
        key,
        marks_correct: q.marks_correct,
        marks_wrong: q.marks_wrong,
        difficulty: q.difficulty,
        chapter: q.chapter,
        chapter_id: q.chapter_id,
        skill_tags: q.skill_tags.into_iter().collect::<BTreeSet<_>>(),
    })
}

/// Partial credit is on if either the legacy flag or the scheme mode asks for it.
fn partial_credit(legacy_flag: Option<bool>, scheme: Option<&TomlScheme>) -> PartialCredit {
    let scheme_partial = scheme
        .and_then(|s| s.mode.as_deref())
        .is_some_and(|m| m.trim().eq_ignore_ascii_case("partial"));
    let mut credit = PartialCredit {
        enabled: legacy_flag.unwrap_or(false) || scheme_partial,
        ..PartialCredit::default()
    };
    if let Some(per_option) = scheme.and_then(|s| s.per_option_marks) {
        credit.per_option_marks = per_option;
    }
    credit
}

/// Outcome of parsing one bank file during a directory scan.
#[derive(Debug)]
pub struct BankScan {
    pub path: PathBuf,
    pub result: Result<MockTest>,
}

/// Recursively parse every `.toml` file under `dir`, keeping failures.
///
/// Files are visited in path order so reports are stable across runs.
pub fn scan_bank_directory(dir: &Path) -> Result<Vec<BankScan>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();

    let mut scans = Vec::new();
    for path in paths {
        if path.is_dir() {
            scans.extend(scan_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            let result = parse_mock_test(&path);
            scans.push(BankScan { path, result });
        }
    }

    Ok(scans)
}

/// Recursively load all `.toml` question banks from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<MockTest>> {
    let mut tests = Vec::new();
    for scan in scan_bank_directory(dir)? {
        match scan.result {
            Ok(test) => tests.push(test),
            Err(e) => tracing::warn!("skipping {}: {:#}", scan.path.display(), e),
        }
    }
    Ok(tests)
}

/// What a validation warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The answer key can never (or always) match.
    AnswerKey,
    /// Missing metadata; the question falls into a default group.
    Grouping,
    /// The test has no questions at all.
    EmptyTest,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::AnswerKey => write!(f, "answer key"),
            WarningKind::Grouping => write!(f, "grouping"),
            WarningKind::EmptyTest => write!(f, "empty test"),
        }
    }
}

/// A data-quality warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub kind: WarningKind,
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a mock test for data-quality issues that still allow scoring.
pub fn validate_mock_test(test: &MockTest) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if test.questions.is_empty() {
        warnings.push(ValidationWarning {
            kind: WarningKind::EmptyTest,
            question_id: None,
            message: "test has no questions".into(),
        });
    }

    for q in &test.questions {
        let mut warn = |kind: WarningKind, message: String| {
            warnings.push(ValidationWarning {
                kind,
                question_id: Some(q.id.clone()),
                message,
            })
        };

        match &q.key {
            AnswerKey::SingleChoice { answer_index: None } => {
                warn(WarningKind::AnswerKey, "single choice question has no answer_index; every response will be incorrect".into())
            }
            AnswerKey::MultipleChoice { answer_indices, .. } if answer_indices.is_empty() => {
                warn(WarningKind::AnswerKey, "multiple choice question has no answer_indices; every response will be incorrect".into())
            }
            AnswerKey::Numerical { range } if range.is_unbounded() => {
                warn(WarningKind::AnswerKey, "numerical question has no range bounds; every number will be correct".into())
            }
            _ => {}
        }

        if is_blank(q.chapter.as_deref()) {
            warn(WarningKind::Grouping, "no chapter; grouped under \"Other\"".into());
        }
        if is_blank(q.difficulty.as_deref()) {
            warn(WarningKind::Grouping, "no difficulty; grouped under \"unknown\"".into());
        }
    }

    warnings
}

fn is_blank(value: Option<&str>) -> bool {
    !matches!(value, Some(v) if !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[test]
id = "physics-mock-1"
name = "Physics Mock 1"
description = "Mechanics and optics"
marks_correct = 4
marks_wrong = -1
duration_mins = 60

[[questions]]
id = "q1"
type = "single_choice"
answer_index = 2
difficulty = "Easy"
chapter = "Kinematics"
chapter_id = "phy-kin"
skill_tags = ["vectors", "graphs"]

[[questions]]
id = "q2"
type = "multiple_choice"
answer_indices = [0, 2]
difficulty = "moderate"
chapter = "Optics"
scheme = { mode = "partial", per_option_marks = 2 }

[[questions]]
id = "q3"
type = "numerical"
range = { min = 5.0, max = 10.0 }
marks_correct = 3
marks_wrong = 0
difficulty = "tough"
chapter = "Kinematics"
"#;

    #[test]
    fn parse_valid_toml() {
        let test = parse_mock_test_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(test.id, "physics-mock-1");
        assert_eq!(test.questions.len(), 3);
        assert_eq!(test.defaults, ScoringDefaults::new(4.0, -1.0));
        assert_eq!(test.duration_mins, Some(60));

        assert_eq!(
            test.questions[0].key,
            AnswerKey::SingleChoice {
                answer_index: Some(2)
            }
        );
        assert_eq!(test.questions[0].skill_tags.len(), 2);

        match &test.questions[1].key {
            AnswerKey::MultipleChoice {
                answer_indices,
                partial,
            } => {
                assert_eq!(answer_indices.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
                assert!(partial.enabled);
                assert_eq!(partial.per_option_marks, 2.0);
            }
            other => panic!("unexpected key: {other:?}"),
        }

        assert_eq!(
            test.questions[2].key,
            AnswerKey::Numerical {
                range: NumericRange::new(5.0, 10.0)
            }
        );
        assert_eq!(test.questions[2].marks_wrong, Some(0.0));
    }

    #[test]
    fn legacy_partial_flag_enables_partial_credit() {
        let toml = r#"
[test]
id = "t"
name = "T"

[[questions]]
id = "q1"
type = "multiple_choice"
answer_indices = [1]
partial_marking = true
"#;
        let test = parse_mock_test_str(toml, &PathBuf::from("t.toml")).unwrap();
        match &test.questions[0].key {
            AnswerKey::MultipleChoice { partial, .. } => {
                assert!(partial.enabled);
                assert_eq!(partial.per_option_marks, 1.0);
            }
            other => panic!("unexpected key: {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let toml = r#"
[test]
id = "dupes"
name = "Dupes"

[[questions]]
id = "same"
type = "single_choice"
answer_index = 0

[[questions]]
id = "same"
type = "numerical"
"#;
        let err = parse_mock_test_str(toml, &PathBuf::from("d.toml")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BankError>(),
            Some(&BankError::DuplicateQuestionId("same".into()))
        );
    }

    #[test]
    fn foreign_answer_field_is_rejected() {
        let toml = r#"
[test]
id = "t"
name = "T"

[[questions]]
id = "q1"
type = "single_choice"
answer_indices = [0, 1]
"#;
        let err = parse_mock_test_str(toml, &PathBuf::from("t.toml")).unwrap_err();
        let bank = err.downcast_ref::<BankError>().unwrap();
        assert_eq!(bank.question_id(), "q1");
        assert!(bank.to_string().contains("answer_indices"));
    }

    #[test]
    fn unknown_type_and_inverted_range_are_rejected() {
        let unknown = r#"
[test]
id = "t"
name = "T"

[[questions]]
id = "q1"
type = "essay"
"#;
        let err = parse_mock_test_str(unknown, &PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BankError>(),
            Some(BankError::UnknownQuestionType { .. })
        ));

        let inverted = r#"
[test]
id = "t"
name = "T"

[[questions]]
id = "q1"
type = "numerical"
range = { min = 10.0, max = 1.0 }
"#;
        let err = parse_mock_test_str(inverted, &PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BankError>(),
            Some(BankError::InvertedRange { .. })
        ));
    }

    #[test]
    fn validate_reports_data_quality_issues() {
        let toml = r#"
[test]
id = "t"
name = "T"

[[questions]]
id = "q1"
type = "single_choice"
chapter = "Algebra"
difficulty = "easy"

[[questions]]
id = "q2"
type = "numerical"
"#;
        let test = parse_mock_test_str(toml, &PathBuf::from("t.toml")).unwrap();
        let warnings = validate_mock_test(&test);
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q1") && w.message.contains("answer_index")));
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q2") && w.message.contains("range")));
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q2") && w.message.contains("chapter")));
        assert!(!warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q1") && w.message.contains("chapter")));
    }

    #[test]
    fn validate_empty_test() {
        let toml = "[test]\nid = \"empty\"\nname = \"Empty\"\n";
        let test = parse_mock_test_str(toml, &PathBuf::from("e.toml")).unwrap();
        let warnings = validate_mock_test(&test);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].question_id.is_none());
        assert_eq!(warnings[0].kind, WarningKind::EmptyTest);
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_mock_test_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("physics.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let tests = load_bank_directory(dir.path()).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].id, "physics-mock-1");
    }

    #[test]
    fn scan_directory_keeps_failures_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b-physics.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("a-broken.toml"), "not toml [").unwrap();
        std::fs::write(dir.path().join("nested").join("c.toml"), VALID_TOML).unwrap();

        let scans = scan_bank_directory(dir.path()).unwrap();
        let names: Vec<_> = scans
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-broken.toml", "b-physics.toml", "c.toml"]);
        assert!(scans[0].result.is_err());
        assert!(scans[1].result.is_ok());
    }

    #[test]
    fn warnings_are_classified() {
        let toml = r#"
[test]
id = "t"
name = "T"

[[questions]]
id = "q1"
type = "multiple_choice"
difficulty = "easy"
"#;
        let test = parse_mock_test_str(toml, &PathBuf::from("t.toml")).unwrap();
        let kinds: Vec<_> = validate_mock_test(&test).iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::AnswerKey, WarningKind::Grouping]);
    }
}

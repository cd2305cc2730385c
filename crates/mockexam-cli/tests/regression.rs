//! Progress comparison integration tests.
//!
//! Scores two attempts through the library, saves them as reports, and
//! drives `mockexam compare` over the files.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use mockexam_core::engine::{score_attempt, AnswerSheet, SubmittedAnswer};
use mockexam_core::model::ScoringDefaults;
use mockexam_core::parser::parse_mock_test;
use mockexam_core::report::AttemptReport;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn mockexam() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("mockexam").unwrap()
}

fn answer(question_id: &str, answer: Value) -> SubmittedAnswer {
    SubmittedAnswer {
        question_id: question_id.into(),
        answer,
        time_sec: 30.0,
    }
}

fn save_attempt(dir: &Path, attempt_id: &str, answers: Vec<SubmittedAnswer>) -> PathBuf {
    let test = parse_mock_test(Path::new("../../banks/physics-mock.toml")).unwrap();
    let sheet = AnswerSheet {
        attempt_id: attempt_id.into(),
        duration_sec: 600,
        answers,
    };
    let scored = score_attempt(&test, &sheet, &ScoringDefaults::default());
    let report = AttemptReport::new(&test, attempt_id, scored);
    let path = dir.join(format!("{attempt_id}.json"));
    report.save_json(&path).unwrap();
    path
}

/// Strong on optics, weak on kinematics.
fn baseline(dir: &Path) -> PathBuf {
    save_attempt(
        dir,
        "baseline",
        vec![
            answer("phy-001", json!(0)),
            answer("phy-002", json!(1)),
            answer("phy-003", json!([1, 3])),
            answer("phy-004", json!([0, 2])),
        ],
    )
}

/// Kinematics fixed, optics forgotten.
fn current(dir: &Path) -> PathBuf {
    save_attempt(
        dir,
        "current",
        vec![
            answer("phy-001", json!(2)),
            answer("phy-002", json!(0)),
            answer("phy-003", json!([0])),
        ],
    )
}

#[test]
fn compare_text_tables_regressions_and_improvements() {
    let dir = TempDir::new().unwrap();
    let baseline = baseline(dir.path());
    let current = current(dir.path());

    mockexam()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 6 / 23 -> 7 / 23 (+1)"))
        .stdout(predicate::str::contains("Accuracy: 33% -> 33% of 6 question(s)"))
        .stdout(predicate::str::is_match(r"Optics.*100%.*0%.*-100.*regressed").unwrap())
        .stdout(predicate::str::is_match(r"Kinematics.*0%.*100%.*\+100.*improved").unwrap())
        .stdout(predicate::str::contains("2 regressions, 2 improvements, 2 unchanged"));
}

#[test]
fn compare_fails_on_regression_when_asked() {
    let dir = TempDir::new().unwrap();
    let baseline = baseline(dir.path());
    let current = current(dir.path());

    mockexam()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .arg("--fail-on-regression")
        .assert()
        .failure();

    // Same attempt on both sides never regresses.
    mockexam()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&baseline)
        .arg("--fail-on-regression")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 regressions"));
}

#[test]
fn compare_markdown_format() {
    let dir = TempDir::new().unwrap();
    let baseline = baseline(dir.path());
    let current = current(dir.path());

    mockexam()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .arg("--format")
        .arg("markdown")
        .assert()
        .success()
        .stdout(predicate::str::contains("## Attempt Comparison"))
        .stdout(predicate::str::contains("| chapter | Optics | 100% | 0% | -100 |"));
}

#[test]
fn compare_json_round_trips_through_serde() {
    let dir = TempDir::new().unwrap();
    let baseline = baseline(dir.path());
    let current = current(dir.path());

    let output = mockexam()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let progress: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(progress["regressions"].as_array().unwrap().len() >= 1);
    assert_eq!(progress["regressions"][0]["kind"], "difficulty");
}

#[test]
fn compare_missing_report_is_an_error() {
    let dir = TempDir::new().unwrap();
    let baseline = baseline(dir.path());

    mockexam()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read report"));
}

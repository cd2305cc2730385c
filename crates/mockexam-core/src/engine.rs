//! Attempt scoring.
//!
//! Joins a submitted answer sheet to its mock test, normalizes each stored
//! answer, evaluates every question in test order, and aggregates the result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, AttemptAnalytics};
use crate::evaluate::evaluate;
use crate::legacy::normalize_response;
use crate::model::{MockTest, ScoringDefaults};

/// One stored answer as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    /// Raw answer in any supported shape; see [`crate::legacy`].
    #[serde(default)]
    pub answer: serde_json::Value,
    /// Seconds spent on the question.
    #[serde(default)]
    pub time_sec: f64,
}

/// Everything a user submitted for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub attempt_id: String,
    /// Wall-clock duration of the attempt.
    #[serde(default)]
    pub duration_sec: u64,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// A problem with the answer sheet that did not stop scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetIssue {
    /// The answer refers to a question that is not part of the test.
    UnknownQuestion { question_id: String },
    /// More than one answer for the same question; the first one was used.
    DuplicateAnswer { question_id: String },
}

/// Analytics for one attempt plus any sheet issues found while scoring it.
#[derive(Debug, Clone)]
pub struct ScoredAttempt {
    pub analytics: AttemptAnalytics,
    pub issues: Vec<SheetIssue>,
}

/// Score an answer sheet against a mock test.
///
/// Test-level marks from the bank take precedence over `fallback` defaults.
/// Questions without an answer are evaluated as unattempted.
pub fn score_attempt(
    test: &MockTest,
    sheet: &AnswerSheet,
    fallback: &ScoringDefaults,
) -> ScoredAttempt {
    let defaults = test.defaults.or(*fallback);
    let known: HashMap<&str, usize> = test
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id.as_str(), i))
        .collect();

    let mut issues = Vec::new();
    let mut by_question: HashMap<&str, &SubmittedAnswer> = HashMap::new();
    for answer in &sheet.answers {
        let id = answer.question_id.as_str();
        if !known.contains_key(id) {
            tracing::warn!(
                "attempt {}: answer for unknown question '{id}' ignored",
                sheet.attempt_id
            );
            issues.push(SheetIssue::UnknownQuestion {
                question_id: id.to_string(),
            });
        } else if by_question.contains_key(id) {
            tracing::warn!(
                "attempt {}: duplicate answer for question '{id}' ignored",
                sheet.attempt_id
            );
            issues.push(SheetIssue::DuplicateAnswer {
                question_id: id.to_string(),
            });
        } else {
            by_question.insert(id, answer);
        }
    }

    let evaluations = test
        .questions
        .iter()
        .map(|q| match by_question.get(q.id.as_str()) {
            Some(submitted) => {
                let response = normalize_response(q.question_type(), &submitted.answer);
                evaluate(q, Some(&response), submitted.time_sec, &defaults)
            }
            None => evaluate(q, None, 0.0, &defaults),
        })
        .collect();

    ScoredAttempt {
        analytics: aggregate(evaluations, &test.questions, sheet.duration_sec, &defaults),
        issues,
    }
}

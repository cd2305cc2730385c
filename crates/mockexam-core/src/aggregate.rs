//! Attempt-level aggregation of per-question evaluations.
//!
//! Turns an ordered list of evaluations into totals and grouped
//! breakdowns by difficulty band and by chapter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    EvaluationResult, Question, QuestionEvaluation, ScoringDefaults, OTHER_CHAPTER,
    UNKNOWN_DIFFICULTY,
};

/// Summary counters for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptTotals {
    pub total_questions: u32,
    pub attempted: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub partial: u32,
    pub unattempted: u32,
    /// Sum of question scores. May be negative.
    pub score: f64,
    /// Sum of effective `marks_correct` over every question of the test.
    pub max_score: f64,
    pub duration_sec: u64,
}

/// Correct-answer rate for one group of questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub correct: u32,
    pub total: u32,
    /// `round(correct / total * 100)`, 0 for an empty group.
    pub percent: u32,
}

impl GroupStats {
    fn record(&mut self, result: EvaluationResult) {
        self.total += 1;
        if result == EvaluationResult::Correct {
            self.correct += 1;
        }
    }

    fn finish(&mut self) {
        self.percent = percent(self.correct, self.total);
    }
}

/// The complete analytics for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptAnalytics {
    pub totals: AttemptTotals,
    pub by_difficulty: BTreeMap<String, GroupStats>,
    pub by_chapter: BTreeMap<String, GroupStats>,
    /// Evaluations in the order they were supplied.
    pub per_question: Vec<QuestionEvaluation>,
}

/// Integer percentage, rounded half away from zero.
pub fn percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

/// Sum of effective `marks_correct` across `questions`.
pub fn max_score(questions: &[Question], defaults: &ScoringDefaults) -> f64 {
    questions.iter().map(|q| defaults.resolve(q).correct).sum()
}

/// Aggregate evaluations into attempt analytics.
///
/// `max_score` depends only on `questions`; every other total is derived
/// from `evaluations`, so `total_questions` is the number of evaluations.
pub fn aggregate(
    evaluations: Vec<QuestionEvaluation>,
    questions: &[Question],
    duration_sec: u64,
    defaults: &ScoringDefaults,
) -> AttemptAnalytics {
    if evaluations.len() != questions.len() {
        tracing::warn!(
            "aggregating {} evaluations against {} questions",
            evaluations.len(),
            questions.len()
        );
    }

    let mut totals = AttemptTotals {
        total_questions: evaluations.len() as u32,
        max_score: max_score(questions, defaults),
        duration_sec,
        ..AttemptTotals::default()
    };
    let mut by_difficulty: BTreeMap<String, GroupStats> = BTreeMap::new();
    let mut by_chapter: BTreeMap<String, GroupStats> = BTreeMap::new();

    for e in &evaluations {
        match e.result {
            EvaluationResult::Correct => totals.correct += 1,
            EvaluationResult::Incorrect => totals.incorrect += 1,
            EvaluationResult::Partial => totals.partial += 1,
            EvaluationResult::Unattempted => totals.unattempted += 1,
        }
        if e.result.is_attempted() {
            totals.attempted += 1;
        }
        totals.score += e.score;

        by_difficulty
            .entry(group_key(Some(&e.difficulty), UNKNOWN_DIFFICULTY))
            .or_default()
            .record(e.result);
        by_chapter
            .entry(group_key(e.chapter.as_deref(), OTHER_CHAPTER))
            .or_default()
            .record(e.result);
    }

    by_difficulty.values_mut().for_each(GroupStats::finish);
    by_chapter.values_mut().for_each(GroupStats::finish);

    AttemptAnalytics {
        totals,
        by_difficulty,
        by_chapter,
        per_question: evaluations,
    }
}

fn group_key(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => fallback.to_string(),
    }
}

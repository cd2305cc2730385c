//! Attempt report types with JSON persistence and progress comparison.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{AttemptAnalytics, GroupStats};
use crate::engine::{ScoredAttempt, SheetIssue};
use crate::model::MockTest;

/// A complete, persistable report for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the mock test.
    pub test: TestSummary,
    /// The attempt this report scores.
    pub attempt_id: String,
    pub analytics: AttemptAnalytics,
    /// Answer-sheet problems found while scoring.
    #[serde(default)]
    pub issues: Vec<SheetIssue>,
}

/// Summary of a mock test (without the question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

impl AttemptReport {
    pub fn new(test: &MockTest, attempt_id: impl Into<String>, scored: ScoredAttempt) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            test: TestSummary {
                id: test.id.clone(),
                name: test.name.clone(),
                question_count: test.questions.len(),
            },
            attempt_id: attempt_id.into(),
            analytics: scored.analytics,
            issues: scored.issues,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Compare this attempt against a baseline attempt.
    ///
    /// A group counts as a regression when its percent drops by more than
    /// `threshold_points`, and as an improvement when it rises by more.
    pub fn compare(&self, baseline: &AttemptReport, threshold_points: u32) -> ProgressReport {
        let mut report = ProgressReport {
            score_delta: self.analytics.totals.score - baseline.analytics.totals.score,
            ..ProgressReport::default()
        };

        compare_groups(
            GroupKind::Difficulty,
            &baseline.analytics.by_difficulty,
            &self.analytics.by_difficulty,
            threshold_points,
            &mut report,
        );
        compare_groups(
            GroupKind::Chapter,
            &baseline.analytics.by_chapter,
            &self.analytics.by_chapter,
            threshold_points,
            &mut report,
        );

        report
    }
}

fn compare_groups(
    kind: GroupKind,
    baseline: &BTreeMap<String, GroupStats>,
    current: &BTreeMap<String, GroupStats>,
    threshold: u32,
    report: &mut ProgressReport,
) {
    let threshold = threshold as i64;
    for (group, stats) in current {
        let Some(base) = baseline.get(group) else {
            report.new_groups += 1;
            continue;
        };
        let delta = stats.percent as i64 - base.percent as i64;
        let change = GroupChange {
            kind,
            group: group.clone(),
            baseline_percent: base.percent,
            current_percent: stats.percent,
            delta,
        };
        if delta < -threshold {
            report.regressions.push(change);
        } else if delta > threshold {
            report.improvements.push(change);
        } else {
            report.unchanged += 1;
        }
    }

    report.removed_groups += baseline
        .keys()
        .filter(|k| !current.contains_key(*k))
        .count();
}

/// Which breakdown a group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Difficulty,
    Chapter,
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKind::Difficulty => write!(f, "difficulty"),
            GroupKind::Chapter => write!(f, "chapter"),
        }
    }
}

/// Result of comparing two attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Current score minus baseline score.
    pub score_delta: f64,
    /// Groups whose percent went down.
    pub regressions: Vec<GroupChange>,
    /// Groups whose percent went up.
    pub improvements: Vec<GroupChange>,
    /// Groups with no significant change.
    pub unchanged: usize,
    /// Groups in current but not baseline.
    pub new_groups: usize,
    /// Groups in baseline but not current.
    pub removed_groups: usize,
}

/// A significant change in one group's percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupChange {
    pub kind: GroupKind,
    pub group: String,
    pub baseline_percent: u32,
    pub current_percent: u32,
    /// Percentage points.
    pub delta: i64,
}

impl ProgressReport {
    /// Returns `true` if any group regressed.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    /// Render the comparison as a Markdown table.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("## Attempt Comparison\n\n");
        md.push_str(&format!("Score change: {:+}\n\n", self.score_delta));

        if self.regressions.is_empty() && self.improvements.is_empty() {
            md.push_str("No significant changes detected.\n");
            return md;
        }

        md.push_str("| Breakdown | Group | Baseline | Current | Delta |\n");
        md.push_str("|-----------|-------|----------|---------|-------|\n");

        for c in self.regressions.iter().chain(&self.improvements) {
            md.push_str(&format!(
                "| {} | {} | {}% | {}% | {:+} |\n",
                c.kind, c.group, c.baseline_percent, c.current_percent, c.delta
            ));
        }

        md.push_str(&format!(
            "\n{} regression(s), {} improvement(s), {} unchanged\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));

        md
    }
}

//! The `mockexam compare` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mockexam_core::aggregate::percent;
use mockexam_core::report::{AttemptReport, GroupChange, ProgressReport};

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: u32,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    let baseline = AttemptReport::load_json(&baseline_path)?;
    let current = AttemptReport::load_json(&current_path)?;

    if baseline.test.id != current.test.id {
        eprintln!(
            "Warning: comparing attempts of different tests ({} vs {})",
            baseline.test.id, current.test.id
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            // text format
            let base = &baseline.analytics.totals;
            let now = &current.analytics.totals;
            println!(
                "Score: {} / {} -> {} / {} ({:+})",
                base.score, base.max_score, now.score, now.max_score, report.score_delta
            );
            println!(
                "Accuracy: {}% -> {}% of {} question(s)",
                percent(base.correct, base.total_questions),
                percent(now.correct, now.total_questions),
                now.total_questions
            );

            if report.regressions.is_empty() && report.improvements.is_empty() {
                println!("\nNo group moved by more than {threshold} point(s).");
            } else {
                println!("\n{}", changes_table(&report));
            }

            println!(
                "\n{} regressions, {} improvements, {} unchanged",
                report.regressions.len(),
                report.improvements.len(),
                report.unchanged
            );
            if report.new_groups > 0 || report.removed_groups > 0 {
                println!(
                    "{} new group(s), {} removed group(s)",
                    report.new_groups, report.removed_groups
                );
            }
        }
    }

    if fail_on_regression && report.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}

/// Regressions first, each side ordered by the size of the move.
fn changes_table(report: &ProgressReport) -> Table {
    let mut rows: Vec<(&GroupChange, &str)> = Vec::new();
    let mut regressions: Vec<&GroupChange> = report.regressions.iter().collect();
    regressions.sort_by_key(|c| c.delta);
    let mut improvements: Vec<&GroupChange> = report.improvements.iter().collect();
    improvements.sort_by_key(|c| std::cmp::Reverse(c.delta));
    rows.extend(regressions.into_iter().map(|c| (c, "regressed")));
    rows.extend(improvements.into_iter().map(|c| (c, "improved")));

    let mut table = Table::new();
    table.set_header(vec!["Breakdown", "Group", "Baseline", "Current", "Delta", ""]);
    for (c, status) in rows {
        table.add_row(vec![
            Cell::new(c.kind),
            Cell::new(&c.group),
            Cell::new(format!("{}%", c.baseline_percent)),
            Cell::new(format!("{}%", c.current_percent)),
            Cell::new(format!("{:+}", c.delta)),
            Cell::new(status),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockexam_core::report::GroupKind;

    fn change(kind: GroupKind, group: &str, from: u32, to: u32) -> GroupChange {
        GroupChange {
            kind,
            group: group.into(),
            baseline_percent: from,
            current_percent: to,
            delta: to as i64 - from as i64,
        }
    }

    #[test]
    fn table_lists_largest_regression_first() {
        let report = ProgressReport {
            regressions: vec![
                change(GroupKind::Chapter, "Waves", 60, 50),
                change(GroupKind::Chapter, "Optics", 100, 0),
            ],
            improvements: vec![change(GroupKind::Difficulty, "easy", 20, 90)],
            ..ProgressReport::default()
        };
        let rendered = changes_table(&report).to_string();
        let optics = rendered.find("Optics").unwrap();
        let waves = rendered.find("Waves").unwrap();
        let easy = rendered.find("easy").unwrap();
        assert!(optics < waves && waves < easy);
        assert!(rendered.contains("-100"));
        assert!(rendered.contains("+70"));
        assert!(rendered.contains("improved"));
    }
}

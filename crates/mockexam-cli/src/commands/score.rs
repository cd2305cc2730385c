//! The `mockexam score` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use mockexam_core::aggregate::GroupStats;
use mockexam_core::config::load_config_from;
use mockexam_core::engine::{score_attempt, AnswerSheet, SheetIssue};
use mockexam_core::parser::parse_mock_test;
use mockexam_core::report::AttemptReport;

pub fn execute(
    bank_path: PathBuf,
    answers_path: PathBuf,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format '{format}', expected text or json"
    );

    let config = load_config_from(config_path.as_deref())?;
    let test = parse_mock_test(&bank_path)?;

    let content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answer sheet: {}", answers_path.display()))?;
    let sheet: AnswerSheet = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answer sheet: {}", answers_path.display()))?;

    let scored = score_attempt(&test, &sheet, &config.scoring);
    let report = AttemptReport::new(&test, sheet.attempt_id.clone(), scored);

    let output = output.unwrap_or(config.output_dir);
    let path = output.join(format!("{}.json", file_stem(&sheet.attempt_id)));
    report.save_json(&path)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    eprintln!("Report saved to: {}", path.display());

    Ok(())
}

/// Attempt ids are opaque; keep only characters safe in a file name.
fn file_stem(attempt_id: &str) -> String {
    let stem: String = attempt_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "attempt".to_string()
    } else {
        stem
    }
}

fn print_summary(report: &AttemptReport) {
    let t = &report.analytics.totals;
    println!("{} (attempt {})", report.test.name, report.attempt_id);
    println!(
        "Score: {} / {} ({} correct, {} partial, {} incorrect, {} unattempted) in {}s",
        t.score, t.max_score, t.correct, t.partial, t.incorrect, t.unattempted, t.duration_sec
    );

    println!("\n{}", group_table("Difficulty", &report.analytics.by_difficulty));
    println!("\n{}", group_table("Chapter", &report.analytics.by_chapter));

    if !report.issues.is_empty() {
        println!("\nAnswer sheet issues:");
        for issue in &report.issues {
            match issue {
                SheetIssue::UnknownQuestion { question_id } => {
                    println!("  [{question_id}] answer for a question not in this test")
                }
                SheetIssue::DuplicateAnswer { question_id } => {
                    println!("  [{question_id}] duplicate answer ignored")
                }
            }
        }
    }
}

fn group_table(label: &str, groups: &BTreeMap<String, GroupStats>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![label, "Correct", "Total", "Accuracy"]);
    for (key, stats) in groups {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(stats.correct),
            Cell::new(stats.total),
            Cell::new(format!("{}%", stats.percent)),
        ]);
    }
    table
}

//! The `mockexam validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mockexam_core::error::BankError;
use mockexam_core::model::{AnswerKey, MockTest, QuestionType};
use mockexam_core::parser::{
    parse_mock_test, scan_bank_directory, validate_mock_test, BankScan, WarningKind,
};

/// Running counts across every bank checked.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    clean: usize,
    with_warnings: usize,
    rejected: usize,
    answer_key: usize,
    grouping: usize,
}

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let scans = if bank_path.is_dir() {
        scan_bank_directory(&bank_path)?
    } else {
        let result = parse_mock_test(&bank_path);
        vec![BankScan {
            path: bank_path,
            result,
        }]
    };

    let mut tally = Tally::default();
    for scan in &scans {
        match &scan.result {
            Ok(test) => report_bank(test, &mut tally),
            Err(e) => {
                tally.rejected += 1;
                println!("{}", scan.path.display());
                match e.downcast_ref::<BankError>() {
                    Some(bank) => println!("  [{}] ERROR: {bank}", bank.question_id()),
                    None => println!("  ERROR: {e:#}"),
                }
            }
        }
    }

    println!(
        "\n{} bank(s) checked: {} clean, {} with warnings, {} rejected",
        scans.len(),
        tally.clean,
        tally.with_warnings,
        tally.rejected
    );
    if tally.answer_key + tally.grouping > 0 {
        println!(
            "Warnings: {} answer key, {} grouping",
            tally.answer_key, tally.grouping
        );
    }

    if tally.rejected > 0 {
        anyhow::bail!("{} question bank(s) rejected", tally.rejected);
    }
    Ok(())
}

fn report_bank(test: &MockTest, tally: &mut Tally) {
    println!("{} [{}]", test.name, test.id);
    println!("  {}", type_breakdown(test));

    let warnings = validate_mock_test(test);
    if warnings.is_empty() {
        tally.clean += 1;
        println!("  ok");
        return;
    }

    tally.with_warnings += 1;
    for w in &warnings {
        match w.kind {
            WarningKind::AnswerKey | WarningKind::EmptyTest => tally.answer_key += 1,
            WarningKind::Grouping => tally.grouping += 1,
        }
        match &w.question_id {
            Some(id) => println!("  [{id}] {}: {}", w.kind, w.message),
            None => println!("  {}: {}", w.kind, w.message),
        }
    }
}

/// e.g. `6 questions: 2 single choice, 2 multiple choice (1 partial), 2 numerical`
fn type_breakdown(test: &MockTest) -> String {
    let count = |ty: QuestionType| {
        test.questions
            .iter()
            .filter(|q| q.question_type() == ty)
            .count()
    };
    let partial = test
        .questions
        .iter()
        .filter(|q| {
            matches!(&q.key, AnswerKey::MultipleChoice { partial, .. } if partial.enabled)
        })
        .count();

    let multiple = if partial > 0 {
        format!(
            "{} multiple choice ({partial} partial)",
            count(QuestionType::MultipleChoice)
        )
    } else {
        format!("{} multiple choice", count(QuestionType::MultipleChoice))
    };

    format!(
        "{} questions: {} single choice, {multiple}, {} numerical",
        test.questions.len(),
        count(QuestionType::SingleChoice),
        count(QuestionType::Numerical)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use mockexam_core::parser::parse_mock_test_str;

    const BANK: &str = r#"
[test]
id = "mixed"
name = "Mixed"

[[questions]]
id = "q1"
type = "single_choice"
answer_index = 0
chapter = "Algebra"

[[questions]]
id = "q2"
type = "multiple_choice"
answer_indices = [0, 1]
partial_marking = true
chapter = "Algebra"
difficulty = "easy"

[[questions]]
id = "q3"
type = "multiple_choice"
difficulty = "easy"
chapter = "Algebra"
"#;

    #[test]
    fn breakdown_counts_types_and_partial_credit() {
        let test = parse_mock_test_str(BANK, Path::new("mixed.toml")).unwrap();
        assert_eq!(
            type_breakdown(&test),
            "3 questions: 1 single choice, 2 multiple choice (1 partial), 0 numerical"
        );
    }

    #[test]
    fn tally_splits_warning_kinds() {
        let test = parse_mock_test_str(BANK, Path::new("mixed.toml")).unwrap();
        let mut tally = Tally::default();
        report_bank(&test, &mut tally);
        assert_eq!(
            tally,
            Tally {
                with_warnings: 1,
                answer_key: 1,
                grouping: 1,
                ..Tally::default()
            }
        );
    }
}

//! Per-question evaluation.
//!
//! Scores one response against one question. Evaluation is pure and never
//! fails: malformed or missing input resolves to `unattempted` or
//! `incorrect`, never to an error.

use std::collections::BTreeSet;

use crate::model::{
    AnswerKey, EvaluationResult, Marks, PartialCredit, Question, QuestionEvaluation, Response,
    ScoringDefaults,
};

/// Evaluate a single response.
///
/// `response` is `None` when the user never touched the question. A response
/// whose type does not match the question is treated as unattempted, since
/// the question-specific field is absent from it.
pub fn evaluate(
    question: &Question,
    response: Option<&Response>,
    elapsed_secs: f64,
    defaults: &ScoringDefaults,
) -> QuestionEvaluation {
    let marks = defaults.resolve(question);
    let (result, score) = match response {
        Some(r) if !r.is_unattempted() => score_response(&question.key, r, marks),
        _ => (EvaluationResult::Unattempted, 0.0),
    };

    QuestionEvaluation {
        question_id: question.id.clone(),
        result,
        score,
        time_sec: whole_seconds(elapsed_secs),
        difficulty: question.normalized_difficulty(),
        question_type: question.question_type(),
        chapter: question.chapter.clone(),
        chapter_id: question.chapter_id.clone(),
        skill_tags: question.skill_tags.clone(),
    }
}

fn score_response(key: &AnswerKey, response: &Response, marks: Marks) -> (EvaluationResult, f64) {
    match (key, response) {
        (
            AnswerKey::SingleChoice { answer_index },
            Response::SingleChoice { choice_index },
        ) => all_or_nothing(answer_index == choice_index, marks),
        (AnswerKey::Numerical { range }, Response::Numerical { value }) => {
            let correct = value
                .as_ref()
                .and_then(|v| v.parse())
                .is_some_and(|n| range.contains(n));
            all_or_nothing(correct, marks)
        }
        (
            AnswerKey::MultipleChoice {
                answer_indices,
                partial,
            },
            Response::MultipleChoice { choice_indices },
        ) => {
            if partial.enabled {
                partial_credit(answer_indices, choice_indices, partial, marks)
            } else {
                all_or_nothing(answer_indices == choice_indices, marks)
            }
        }
        _ => (EvaluationResult::Unattempted, 0.0),
    }
}

fn all_or_nothing(correct: bool, marks: Marks) -> (EvaluationResult, f64) {
    if correct {
        (EvaluationResult::Correct, marks.correct)
    } else {
        (EvaluationResult::Incorrect, marks.wrong)
    }
}

/// Per-option credit for multiple-choice questions.
///
/// Each correctly chosen option earns `per_option_marks`; each wrong option
/// costs `marks.wrong` when that is negative.
fn partial_credit(
    correct: &BTreeSet<u32>,
    chosen: &BTreeSet<u32>,
    config: &PartialCredit,
    marks: Marks,
) -> (EvaluationResult, f64) {
    let correct_chosen = chosen.intersection(correct).count();
    let wrong_chosen = chosen.difference(correct).count();

    let mut score = correct_chosen as f64 * config.per_option_marks;
    if marks.wrong < 0.0 {
        score += wrong_chosen as f64 * marks.wrong;
    }

    let result = if correct_chosen == 0 {
        EvaluationResult::Incorrect
    } else if correct_chosen == correct.len() && wrong_chosen == 0 {
        EvaluationResult::Correct
    } else {
        EvaluationResult::Partial
    };

    (result, score)
}

/// Clamp to non-negative and floor. Non-finite input counts as zero.
fn whole_seconds(elapsed_secs: f64) -> u64 {
    if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
        elapsed_secs.floor() as u64
    } else {
        0
    }
}

//! Question bank error types.
//!
//! Structural problems that make a bank unusable. Softer data-quality
//! issues are reported as warnings by `parser::validate_mock_test` instead.

use thiserror::Error;

/// Errors raised while building a mock test from its source definition.
#[derive(Debug, Error, PartialEq)]
pub enum BankError {
    /// Two questions share the same identifier.
    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(String),

    /// The `type` field is not a known question type.
    #[error("question {question_id}: unknown question type '{value}'")]
    UnknownQuestionType { question_id: String, value: String },

    /// The question carries an answer field that belongs to another type.
    #[error("question {question_id}: field '{field}' is not valid for {question_type} questions")]
    ForeignAnswerField {
        question_id: String,
        question_type: String,
        field: &'static str,
    },

    /// A numerical range whose lower bound exceeds its upper bound.
    #[error("question {question_id}: range min {min} is greater than max {max}")]
    InvertedRange {
        question_id: String,
        min: f64,
        max: f64,
    },
}

impl BankError {
    /// The question the error refers to.
    pub fn question_id(&self) -> &str {
        match self {
            BankError::DuplicateQuestionId(id) => id,
            BankError::UnknownQuestionType { question_id, .. }
            | BankError::ForeignAnswerField { question_id, .. }
            | BankError::InvertedRange { question_id, .. } => question_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_question() {
        let err = BankError::InvertedRange {
            question_id: "q7".into(),
            min: 3.0,
            max: 1.0,
        };
        assert_eq!(err.question_id(), "q7");
        assert_eq!(err.to_string(), "question q7: range min 3 is greater than max 1");
    }
}

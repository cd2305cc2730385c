//! Normalization of stored response shapes.
//!
//! Older clients persisted answers in several ad hoc shapes. This adapter
//! maps any of them onto the canonical [`Response`] for a question type, so
//! the evaluator only ever sees one shape. Unrecognized input becomes the
//! unattempted response; normalization never fails.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::model::{NumericInput, QuestionType, Response};

const SINGLE_KEYS: &[&str] = &[
    "choiceIndex",
    "choice_index",
    "selectedIndex",
    "selected",
    "answer",
];
const MULTIPLE_KEYS: &[&str] = &[
    "choiceIndices",
    "choice_indices",
    "selectedIndices",
    "selected",
    "answers",
];
const NUMERIC_KEYS: &[&str] = &["value", "answer", "numericValue"];

/// Convert a stored answer into the canonical response for `question_type`.
pub fn normalize_response(question_type: QuestionType, raw: &Value) -> Response {
    if let Ok(canonical) = serde_json::from_value::<Response>(raw.clone()) {
        if canonical.question_type() == question_type {
            return canonical;
        }
    }

    match question_type {
        QuestionType::SingleChoice => Response::SingleChoice {
            choice_index: lookup(raw, SINGLE_KEYS).and_then(as_index),
        },
        QuestionType::MultipleChoice => Response::MultipleChoice {
            choice_indices: lookup(raw, MULTIPLE_KEYS)
                .map(as_index_set)
                .unwrap_or_default(),
        },
        QuestionType::Numerical => Response::Numerical {
            value: lookup(raw, NUMERIC_KEYS).and_then(as_numeric),
        },
    }
}

/// The value itself for scalars and arrays, or the first non-null known key of an object.
fn lookup<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    match raw {
        Value::Null => None,
        Value::Object(map) => keys
            .iter()
            .find_map(|k| map.get(*k).filter(|v| !v.is_null())),
        other => Some(other),
    }
}

fn as_index(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|i| u32::try_from(i).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_index_set(v: &Value) -> BTreeSet<u32> {
    match v {
        Value::Array(items) => items.iter().filter_map(as_index).collect(),
        scalar => as_index(scalar).into_iter().collect(),
    }
}

fn as_numeric(v: &Value) -> Option<NumericInput> {
    match v {
        Value::Number(n) => n.as_f64().map(NumericInput::Number),
        Value::String(s) => Some(NumericInput::Text(s.clone())),
        _ => None,
    }
}

use std::fmt::Write;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use mockexam_core::legacy::normalize_response;
use mockexam_core::model::QuestionType;
use mockexam_core::parser::{parse_mock_test_str, validate_mock_test};

fn make_bank(n: usize) -> String {
    let mut toml = String::from("[test]\nid = \"bench\"\nname = \"Bench\"\n");
    for i in 0..n {
        let body = match i % 3 {
            0 => "type = \"single_choice\"\nanswer_index = 1".to_string(),
            1 => "type = \"multiple_choice\"\nanswer_indices = [0, 2]\npartial_marking = true"
                .to_string(),
            _ => "type = \"numerical\"\nrange = { min = 1.0, max = 2.0 }".to_string(),
        };
        let _ = write!(
            toml,
            "\n[[questions]]\nid = \"q{i}\"\n{body}\ndifficulty = \"easy\"\nchapter = \"c{}\"\n",
            i % 5
        );
    }
    toml
}

fn bench_parse_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_bank");
    let path = Path::new("bench.toml");

    for n in [30usize, 300] {
        let bank = make_bank(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| parse_mock_test_str(black_box(&bank), path).unwrap())
        });
    }

    let test = parse_mock_test_str(&make_bank(300), path).unwrap();
    group.bench_function("validate/questions=300", |b| {
        b.iter(|| validate_mock_test(black_box(&test)))
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_response");

    let shapes = [
        ("canonical", QuestionType::SingleChoice, json!({"type": "single_choice", "choice_index": 2})),
        ("legacy_object", QuestionType::SingleChoice, json!({"selectedIndex": 2})),
        ("bare_array", QuestionType::MultipleChoice, json!([0, 2, 3])),
        ("numeric_text", QuestionType::Numerical, json!({"value": "12.5"})),
    ];

    for (name, ty, raw) in &shapes {
        group.bench_function(*name, |b| {
            b.iter(|| normalize_response(*ty, black_box(raw)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_bank, bench_normalize);
criterion_main!(benches);

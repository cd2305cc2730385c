//! The `mockexam init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("mockexam.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("banks")?;
    write_if_missing(Path::new("banks/example.toml"), EXAMPLE_BANK)?;
    write_if_missing(Path::new("banks/example-answers.json"), EXAMPLE_ANSWERS)?;
    write_if_missing(Path::new("banks/example-proctor.txt"), EXAMPLE_SCRIPT)?;

    println!("\nNext steps:");
    println!("  1. Run: mockexam validate --bank banks/example.toml");
    println!(
        "  2. Run: mockexam score --bank banks/example.toml --answers banks/example-answers.json"
    );
    println!("  3. Run: mockexam proctor --script banks/example-proctor.txt");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mockexam configuration

output_dir = "./mockexam-results"

# Marks used when a question bank sets none.
[scoring]
marks_correct = 4
marks_wrong = -1

[proctoring]
grace_secs = 10
max_strikes = 3
"#;

const EXAMPLE_BANK: &str = r#"[test]
id = "example"
name = "Example Mock Test"
description = "A small physics mock to get started"
duration_mins = 30

[[questions]]
id = "q1"
type = "single_choice"
answer_index = 2
difficulty = "easy"
chapter = "Kinematics"
skill_tags = ["graphs"]

[[questions]]
id = "q2"
type = "multiple_choice"
answer_indices = [0, 3]
difficulty = "medium"
chapter = "Optics"

[questions.scheme]
mode = "partial"
per_option_marks = 1

[[questions]]
id = "q3"
type = "numerical"
range = { min = 9.7, max = 9.9 }
difficulty = "hard"
chapter = "Gravitation"
"#;

const EXAMPLE_ANSWERS: &str = r#"{
  "attempt_id": "example-attempt-1",
  "duration_sec": 1260,
  "answers": [
    { "question_id": "q1", "answer": { "type": "single_choice", "choice_index": 2 }, "time_sec": 48 },
    { "question_id": "q2", "answer": { "selectedIndices": [0] }, "time_sec": 95.4 },
    { "question_id": "q3", "answer": "9.81", "time_sec": 130 }
  ]
}
"#;

const EXAMPLE_SCRIPT: &str = r#"# <second> detect <fullscreen|tab-hidden|blur>
# <second> clear
# <second> time-up
12 detect tab-hidden
16 clear
300 detect fullscreen
304 clear
1800 time-up
"#;

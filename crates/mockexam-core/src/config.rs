//! mockexam configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::ScoringDefaults;

/// Top-level mockexam configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockExamConfig {
    /// Marking defaults used when a question bank sets none.
    #[serde(default)]
    pub scoring: ScoringDefaults,
    #[serde(default)]
    pub proctoring: ProctoringSettings,
    /// Output directory for attempt reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Proctoring knobs; handed to the guard by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctoringSettings {
    /// Seconds a violation may last before the attempt is auto-submitted.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u32,
    /// Cured violations allowed before the next one submits immediately.
    #[serde(default = "default_max_strikes")]
    pub max_strikes: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./mockexam-results")
}
fn default_grace_secs() -> u32 {
    10
}
fn default_max_strikes() -> u32 {
    3
}

impl Default for ProctoringSettings {
    fn default() -> Self {
        Self {
            grace_secs: default_grace_secs(),
            max_strikes: default_max_strikes(),
        }
    }
}

impl Default for MockExamConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringDefaults::default(),
            proctoring: ProctoringSettings::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mockexam.toml` in the current directory
/// 2. `~/.config/mockexam/config.toml`
///
/// Environment variable override: `MOCKEXAM_OUTPUT_DIR`.
pub fn load_config() -> Result<MockExamConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MockExamConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("mockexam.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MockExamConfig::default(),
    };

    if let Ok(dir) = std::env::var("MOCKEXAM_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }

    Ok(config)
}

/// Parse config TOML and expand `${VAR}` references in the output directory.
pub fn parse_config(content: &str) -> Result<MockExamConfig> {
    let mut config: MockExamConfig = toml::from_str(content)?;
    let output_dir = config.output_dir.to_string_lossy().into_owned();
    config.output_dir = PathBuf::from(resolve_env_vars(&output_dir));
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mockexam"))
}

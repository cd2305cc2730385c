//! The `mockexam proctor` command: replay an environment-event script.
//!
//! Script format, one event per line:
//!
//! ```text
//! # comment
//! 3 detect tab-hidden
//! 7 clear
//! 60 time-up
//! ```
//!
//! The number is the second since the attempt started.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use mockexam_core::config::{load_config_from, ProctoringSettings};
use mockexam_proctor::{
    EnvironmentSignal, GuardConfig, GuardOutcome, ProctorGuard, ProctorSession, ProctoringState,
    SubmitHandler, ViolationReason,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScriptAction {
    Signal(EnvironmentSignal),
    TimeUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScriptEvent {
    pub at_sec: u64,
    pub action: ScriptAction,
}

pub async fn execute(script: PathBuf, config_path: Option<PathBuf>, realtime: bool) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let guard_config = guard_config(config.proctoring);
    let events = load_script(&script)?;

    println!(
        "Replaying {} event(s) with a {}s grace period and {} strike(s)",
        events.len(),
        guard_config.grace_secs,
        guard_config.max_strikes
    );

    let (state, submission) = if realtime {
        replay_live(guard_config, &events).await?
    } else {
        let replay = replay(guard_config, &events);
        for (at, line) in &replay.log {
            println!("[{at:>4}s] {line}");
        }
        (replay.state, replay.submission)
    };

    println!();
    println!("Strikes: {}", state.strike_count);
    println!(
        "Final warning: {}",
        if state.final_warning_armed { "armed" } else { "not armed" }
    );
    match submission {
        Some(true) => println!("Result: auto-submitted (violation)"),
        Some(false) => println!("Result: submitted (time up)"),
        None => println!("Result: not submitted"),
    }

    Ok(())
}

fn guard_config(settings: ProctoringSettings) -> GuardConfig {
    GuardConfig {
        grace_secs: settings.grace_secs,
        max_strikes: settings.max_strikes,
    }
}

fn load_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {}", path.display()))?;
    parse_script(&content).with_context(|| format!("failed to parse script: {}", path.display()))
}

/// Parse a replay script. Events are returned sorted by time; events at the
/// same second keep their script order.
pub(crate) fn parse_script(content: &str) -> Result<Vec<ScriptEvent>> {
    let mut events = Vec::new();

    for (n, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let lineno = n + 1;
        let mut parts = line.split_whitespace();

        let at_sec: u64 = parts
            .next()
            .unwrap_or("")
            .parse()
            .with_context(|| format!("line {lineno}: expected a whole number of seconds"))?;

        let action = match parts.next() {
            Some("detect") => {
                let reason = parts
                    .next()
                    .with_context(|| format!("line {lineno}: detect needs a reason"))?;
                let reason: ViolationReason = reason
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("line {lineno}: {e}"))?;
                ScriptAction::Signal(EnvironmentSignal::Detected(reason))
            }
            Some("clear") => ScriptAction::Signal(EnvironmentSignal::Cleared),
            Some("time-up") | Some("time_up") => ScriptAction::TimeUp,
            Some(other) => anyhow::bail!("line {lineno}: unknown action '{other}'"),
            None => anyhow::bail!("line {lineno}: missing action"),
        };

        if let Some(extra) = parts.next() {
            anyhow::bail!("line {lineno}: unexpected '{extra}'");
        }

        events.push(ScriptEvent { at_sec, action });
    }

    events.sort_by_key(|e| e.at_sec);
    Ok(events)
}

/// Outcome of a simulated replay.
#[derive(Debug)]
pub(crate) struct Replay {
    pub log: Vec<(u64, String)>,
    pub state: ProctoringState,
    pub submission: Option<bool>,
}

/// Replay a script on a simulated clock.
///
/// Countdown ticks fall on whole seconds after the violation started. A tick
/// due at the same second as a scripted event is applied first.
pub(crate) fn replay(config: GuardConfig, events: &[ScriptEvent]) -> Replay {
    let mut guard = ProctorGuard::new(config);
    let mut log = Vec::new();
    let mut submission = None;
    let mut next_tick: Option<u64> = None;

    let mut record = |at: u64, what: String, outcome: GuardOutcome, next_tick: &mut Option<u64>| {
        match outcome {
            GuardOutcome::CountdownStarted { .. } => *next_tick = Some(at + 1),
            GuardOutcome::CountdownTick { .. } => *next_tick = Some(at + 1),
            GuardOutcome::Cured { .. } | GuardOutcome::AutoSubmit { .. } => *next_tick = None,
            GuardOutcome::Ignored => {}
        }
        if let GuardOutcome::AutoSubmit { is_violation } = outcome {
            submission = Some(is_violation);
        }
        log.push((at, format!("{what} -> {}", describe(outcome))));
    };

    for event in events {
        while let Some(due) = next_tick.filter(|due| *due <= event.at_sec) {
            let outcome = guard.tick();
            record(due, "tick".to_string(), outcome, &mut next_tick);
        }
        if guard.is_submitted() {
            break;
        }

        let (what, outcome) = match event.action {
            ScriptAction::Signal(EnvironmentSignal::Detected(reason)) => {
                (format!("detect {reason}"), guard.signal_detected(reason))
            }
            ScriptAction::Signal(EnvironmentSignal::Cleared) => {
                ("clear".to_string(), guard.signal_cleared())
            }
            ScriptAction::TimeUp => ("time up".to_string(), guard.time_up()),
        };
        record(event.at_sec, what, outcome, &mut next_tick);
        if guard.is_submitted() {
            break;
        }
    }

    // A violation still open at the end of the script runs out its grace.
    while let Some(due) = next_tick {
        let outcome = guard.tick();
        record(due, "tick".to_string(), outcome, &mut next_tick);
    }

    Replay {
        log,
        state: guard.snapshot(),
        submission,
    }
}

fn describe(outcome: GuardOutcome) -> String {
    match outcome {
        GuardOutcome::Ignored => "ignored".to_string(),
        GuardOutcome::CountdownStarted {
            reason,
            remaining_secs,
            ..
        } => format!("countdown started ({reason}, {remaining_secs}s left)"),
        GuardOutcome::CountdownTick { remaining_secs } => format!("{remaining_secs}s left"),
        GuardOutcome::Cured {
            strike_count,
            final_warning_armed,
        } => {
            if final_warning_armed {
                format!("cured, strike {strike_count}, final warning armed")
            } else {
                format!("cured, strike {strike_count}")
            }
        }
        GuardOutcome::AutoSubmit { is_violation: true } => "AUTO-SUBMIT (violation)".to_string(),
        GuardOutcome::AutoSubmit {
            is_violation: false,
        } => "SUBMIT (time up)".to_string(),
    }
}

/// Records the submit decision made by a live session.
#[derive(Default)]
struct PrintingSubmitter {
    decision: Mutex<Option<bool>>,
}

#[async_trait]
impl SubmitHandler for PrintingSubmitter {
    async fn auto_submit(&self, is_violation: bool) {
        println!("submit callback fired (violation: {is_violation})");
        *self.decision.lock().await = Some(is_violation);
    }
}

async fn replay_live(
    config: GuardConfig,
    events: &[ScriptEvent],
) -> Result<(ProctoringState, Option<bool>)> {
    let submitter = Arc::new(PrintingSubmitter::default());
    let handle = ProctorSession::spawn(config, submitter.clone());
    let start = Instant::now();

    for event in events {
        sleep_until(start + Duration::from_secs(event.at_sec)).await;
        if handle.is_finished() {
            break;
        }
        let outcome = match event.action {
            ScriptAction::Signal(signal) => handle.signal(signal).await,
            ScriptAction::TimeUp => handle.time_up().await,
        };
        match outcome {
            Ok(outcome) => println!("[{:>4}s] {}", event.at_sec, describe(outcome)),
            Err(e) if e.is_session_closed() => break,
            Err(e) => return Err(e.into()),
        }
    }

    let state = if handle.snapshot().violation.is_some() {
        tracing::info!("waiting for the open violation's grace period to run out");
        handle.finished().await
    } else {
        handle.shutdown().await
    };

    let submission = *submitter.decision.lock().await;
    Ok((state, submission))
}

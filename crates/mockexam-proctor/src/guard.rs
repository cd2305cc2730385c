//! Proctoring guard state machine.
//!
//! The guard is pure: it owns no timers and never calls out. Each input
//! (environment signal, countdown tick, backup expiry) returns a
//! [`GuardOutcome`] telling the caller what happened. The session
//! controller in [`crate::session`] drives it with real timers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Guard tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Seconds a violation may last before the attempt is auto-submitted.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u32,
    /// Cured violations allowed before the next one submits immediately.
    #[serde(default = "default_max_strikes")]
    pub max_strikes: u32,
}

fn default_grace_secs() -> u32 {
    10
}

fn default_max_strikes() -> u32 {
    3
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            grace_secs: default_grace_secs(),
            max_strikes: default_max_strikes(),
        }
    }
}

/// Why the exam environment is out of compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    FullscreenExited,
    TabHidden,
    WindowBlurred,
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationReason::FullscreenExited => write!(f, "fullscreen exited"),
            ViolationReason::TabHidden => write!(f, "tab hidden"),
            ViolationReason::WindowBlurred => write!(f, "window lost focus"),
        }
    }
}

impl std::str::FromStr for ViolationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "fullscreen" | "fullscreen_exited" => Ok(ViolationReason::FullscreenExited),
            "tab" | "tab_hidden" | "hidden" => Ok(ViolationReason::TabHidden),
            "blur" | "window_blurred" => Ok(ViolationReason::WindowBlurred),
            other => Err(format!("unknown violation reason: {other}")),
        }
    }
}

/// A browser-level change in the exam environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "reason", rename_all = "snake_case")]
pub enum EnvironmentSignal {
    /// Fullscreen lost, tab hidden, or window blurred.
    Detected(ViolationReason),
    /// Fullscreen restored, tab visible, or window focused.
    Cleared,
}

/// An active grace-period countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub reason: ViolationReason,
    pub remaining_secs: u32,
}

/// Snapshot of the guard for display and inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctoringState {
    /// Present iff a countdown is running.
    pub violation: Option<Violation>,
    pub strike_count: u32,
    pub final_warning_armed: bool,
    /// Set once the attempt has been handed to the submit callback.
    pub submitted: bool,
}

/// What a single guard input caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// No state change.
    Ignored,
    /// A grace-period countdown began. `epoch` identifies this violation.
    CountdownStarted {
        reason: ViolationReason,
        remaining_secs: u32,
        epoch: u64,
    },
    /// One second of grace elapsed.
    CountdownTick { remaining_secs: u32 },
    /// The violation was cured in time.
    Cured {
        strike_count: u32,
        final_warning_armed: bool,
    },
    /// The attempt must be submitted now. Emitted at most once per guard.
    AutoSubmit { is_violation: bool },
}

/// The proctoring state machine for one exam attempt.
#[derive(Debug, Clone)]
pub struct ProctorGuard {
    config: GuardConfig,
    violation: Option<Violation>,
    epoch: u64,
    strike_count: u32,
    final_warning_armed: bool,
    submitted: bool,
}

impl ProctorGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            violation: None,
            epoch: 0,
            strike_count: 0,
            // No strikes allowed: the first violation is already past the final warning.
            final_warning_armed: config.max_strikes == 0,
            submitted: false,
        }
    }

    pub fn config(&self) -> GuardConfig {
        self.config
    }

    pub fn snapshot(&self) -> ProctoringState {
        ProctoringState {
            violation: self.violation,
            strike_count: self.strike_count,
            final_warning_armed: self.final_warning_armed,
            submitted: self.submitted,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Epoch of the running countdown, if any.
    pub fn active_epoch(&self) -> Option<u64> {
        self.violation.map(|_| self.epoch)
    }

    pub fn apply(&mut self, signal: EnvironmentSignal) -> GuardOutcome {
        match signal {
            EnvironmentSignal::Detected(reason) => self.signal_detected(reason),
            EnvironmentSignal::Cleared => self.signal_cleared(),
        }
    }

    /// Environment went out of compliance.
    ///
    /// Re-entrant detections during a countdown are ignored. Once the final
    /// warning is armed the attempt is submitted without a grace period.
    pub fn signal_detected(&mut self, reason: ViolationReason) -> GuardOutcome {
        if self.submitted || self.violation.is_some() {
            return GuardOutcome::Ignored;
        }
        if self.final_warning_armed {
            tracing::info!("violation after final warning ({reason}), submitting immediately");
            return self.submit(true);
        }
        if self.config.grace_secs == 0 {
            tracing::info!("violation with no grace period ({reason}), submitting immediately");
            self.strike_count += 1;
            return self.submit(true);
        }

        self.epoch += 1;
        self.violation = Some(Violation {
            reason,
            remaining_secs: self.config.grace_secs,
        });
        tracing::info!(
            "violation detected ({reason}), {}s to return",
            self.config.grace_secs
        );
        GuardOutcome::CountdownStarted {
            reason,
            remaining_secs: self.config.grace_secs,
            epoch: self.epoch,
        }
    }

    /// Environment is compliant again.
    pub fn signal_cleared(&mut self) -> GuardOutcome {
        if self.submitted || self.violation.take().is_none() {
            return GuardOutcome::Ignored;
        }

        self.strike_count += 1;
        if self.strike_count >= self.config.max_strikes {
            self.final_warning_armed = true;
        }
        tracing::info!(
            strikes = self.strike_count,
            final_warning = self.final_warning_armed,
            "violation cured"
        );
        GuardOutcome::Cured {
            strike_count: self.strike_count,
            final_warning_armed: self.final_warning_armed,
        }
    }

    /// One second of the countdown elapsed.
    pub fn tick(&mut self) -> GuardOutcome {
        if self.submitted {
            return GuardOutcome::Ignored;
        }
        let Some(violation) = self.violation.as_mut() else {
            return GuardOutcome::Ignored;
        };

        violation.remaining_secs = violation.remaining_secs.saturating_sub(1);
        if violation.remaining_secs == 0 {
            self.expire()
        } else {
            GuardOutcome::CountdownTick {
                remaining_secs: violation.remaining_secs,
            }
        }
    }

    /// The fallback timer for countdown `epoch` fired.
    ///
    /// A no-op unless that same countdown is still running, so a late
    /// backup can never submit twice or cut a later violation short.
    pub fn backup_expired(&mut self, epoch: u64) -> GuardOutcome {
        if self.submitted || self.active_epoch() != Some(epoch) {
            return GuardOutcome::Ignored;
        }
        tracing::warn!("countdown stalled, backup timer submitting");
        self.expire()
    }

    /// The exam's own clock ran out.
    pub fn time_up(&mut self) -> GuardOutcome {
        if self.submitted {
            return GuardOutcome::Ignored;
        }
        self.violation = None;
        self.submit(false)
    }

    fn expire(&mut self) -> GuardOutcome {
        self.violation = None;
        self.strike_count += 1;
        tracing::info!("grace period expired, submitting");
        self.submit(true)
    }

    fn submit(&mut self, is_violation: bool) -> GuardOutcome {
        self.submitted = true;
        GuardOutcome::AutoSubmit { is_violation }
    }
}

impl Default for ProctorGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

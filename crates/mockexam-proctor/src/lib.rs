//! mockexam-proctor: Proctoring guard for exam attempts.
//!
//! Tracks loss of fullscreen or focus during an attempt, gives the user a
//! grace period to return, escalates repeated violations, and triggers an
//! auto-submit callback exactly once.

pub mod error;
pub mod fullscreen;
pub mod guard;
pub mod session;

pub use error::ProctorError;
pub use guard::{
    EnvironmentSignal, GuardConfig, GuardOutcome, ProctorGuard, ProctoringState, Violation,
    ViolationReason,
};
pub use session::{ProctorHandle, ProctorSession, SubmitHandler};

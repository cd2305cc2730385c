//! Best-effort fullscreen control.
//!
//! Entering fullscreen is a request the host may refuse. Failures are
//! logged and surfaced only as a prompt the user can retry; they never
//! touch the guard's state.

use crate::error::ProctorError;

/// Host-side fullscreen API.
pub trait FullscreenControl: Send + Sync {
    fn enter(&self) -> Result<(), ProctorError>;
    fn exit(&self) -> Result<(), ProctorError>;
}

/// What the exam view should show after a fullscreen request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenPrompt {
    /// Fullscreen is active; hide the prompt.
    Entered,
    /// Keep showing the "enter fullscreen" prompt.
    StillRequired,
}

/// Ask the host to enter fullscreen, swallowing any failure.
pub fn request_fullscreen(control: &dyn FullscreenControl) -> FullscreenPrompt {
    match control.enter() {
        Ok(()) => FullscreenPrompt::Entered,
        Err(e) => {
            tracing::warn!("could not enter fullscreen: {e}");
            FullscreenPrompt::StillRequired
        }
    }
}

/// Leave fullscreen at the end of a session, swallowing any failure.
pub fn release_fullscreen(control: &dyn FullscreenControl) {
    if let Err(e) = control.exit() {
        tracing::warn!("could not exit fullscreen: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Refuses the first `failures` requests, then succeeds.
    struct FlakyHost {
        failures: AtomicU32,
    }

    impl FullscreenControl for FlakyHost {
        fn enter(&self) -> Result<(), ProctorError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ProctorError::FullscreenRejected("user gesture required".into()));
            }
            Ok(())
        }

        fn exit(&self) -> Result<(), ProctorError> {
            Err(ProctorError::FullscreenRejected("not in fullscreen".into()))
        }
    }

    #[test]
    fn failures_keep_prompt_until_retry_succeeds() {
        let host = FlakyHost {
            failures: AtomicU32::new(1),
        };
        assert_eq!(request_fullscreen(&host), FullscreenPrompt::StillRequired);
        assert_eq!(request_fullscreen(&host), FullscreenPrompt::Entered);
        release_fullscreen(&host);
    }
}

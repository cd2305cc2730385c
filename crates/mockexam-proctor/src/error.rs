//! Proctoring error types.

use thiserror::Error;

/// Errors that can occur while driving a proctoring session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProctorError {
    /// The session task has ended (submitted or shut down).
    #[error("proctoring session is closed")]
    SessionClosed,

    /// The host refused to enter or leave fullscreen.
    #[error("fullscreen request rejected: {0}")]
    FullscreenRejected(String),
}

impl ProctorError {
    /// Returns `true` if the session can no longer accept signals.
    pub fn is_session_closed(&self) -> bool {
        matches!(self, ProctorError::SessionClosed)
    }
}

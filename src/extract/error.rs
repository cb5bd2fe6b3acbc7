//! Backend errors and their classification
//!
//! Only session-class failures count against backend health. The class is
//! decided from the error text, because the backend reports an expired or
//! unreachable session the same way (same status, same shape) as any other
//! failure.

use thiserror::Error;

/// Substrings (lower-case) that identify a session-class failure
const SESSION_ERROR_SIGNATURES: &[&str] = &[
    "session has completed or timed out",
    "session has completed",
    "session has timed out",
    "session timed out",
    "cannot connect to session",
    "could not connect to session",
    "session not found",
    "session is closed",
    "session closed",
    "target page, context or browser has been closed",
];

/// Error raised by an extraction backend call
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Classifies the error for retry and health decisions
    pub fn class(&self) -> FailureClass {
        if is_session_error_message(&self.to_string()) {
            FailureClass::Session
        } else {
            FailureClass::Permanent
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Returns true when `message` carries a known session-failure signature
pub fn is_session_error_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    SESSION_ERROR_SIGNATURES
        .iter()
        .any(|signature| lower.contains(signature))
}

/// Failure class of an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Backend session unavailable; retryable, feeds the health monitor
    Session,

    /// Anything else; fails only the one item, never retried
    Permanent,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session_error",
            Self::Permanent => "extraction_error",
        }
    }
}

/// A failed extraction: class plus the backend's reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub class: FailureClass,
    pub message: String,
}

impl From<&BackendError> for ExtractionFailure {
    fn from(e: &BackendError) -> Self {
        Self {
            class: e.class(),
            message: e.to_string(),
        }
    }
}

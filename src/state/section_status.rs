/// Section status definitions for tracking a section's crawl lifecycle
///
/// `Pending -> Running -> {Complete, BackendExhausted, ErrorAborted}`
use serde::Serialize;
use std::fmt;

/// Represents the current status of one section in a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Section has not started yet
    Pending,

    /// Section's crawl loop is active
    Running,

    /// Pagination finished normally or the page budget was reached
    Complete,

    /// The backend session became unhealthy (or the run was cancelled)
    BackendExhausted,

    /// An unexpected error ended the section
    ErrorAborted,
}

impl SectionStatus {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::BackendExhausted | Self::ErrorAborted
        )
    }

    /// Returns true if moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: SectionStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::ErrorAborted),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::BackendExhausted => "backend_exhausted",
            Self::ErrorAborted => "error_aborted",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "backend_exhausted" => Some(Self::BackendExhausted),
            "error_aborted" => Some(Self::ErrorAborted),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Running,
            Self::Complete,
            Self::BackendExhausted,
            Self::ErrorAborted,
        ]
    }
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

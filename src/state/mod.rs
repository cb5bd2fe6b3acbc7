//! State tracking for section runs and backend sessions
//!
//! - [`SectionStatus`]: lifecycle of one section's crawl
//! - [`SessionHealth`]: circuit breaker over one backend session

mod section_status;
mod session_health;

pub use section_status::SectionStatus;
pub use session_health::{HealthSignal, SessionHealth, DEFAULT_FAILURE_THRESHOLD};

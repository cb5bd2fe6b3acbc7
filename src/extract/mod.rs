//! Extraction backend access
//!
//! - [`ExtractionBackend`] / [`BackendProvider`]: the remote capability, one
//!   session per section
//! - [`ExtractionAdapter`]: timed, classified, normalized calls with one
//!   metric event each
//! - [`HttpBackendProvider`]: JSON-over-HTTP implementation

mod adapter;
mod backend;
mod error;
mod http;
pub mod instructions;

pub use adapter::{Extraction, ExtractionAdapter, ExtractionKind, ExtractionOutcome};
pub use backend::{BackendProvider, ExtractionBackend, ExtractionRequest};
pub use error::{is_session_error_message, BackendError, ExtractionFailure, FailureClass};
pub use http::{build_http_client, HttpBackendProvider, HttpSession};

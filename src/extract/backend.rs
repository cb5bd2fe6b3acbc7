//! Extraction backend interface
//!
//! A backend session is one provisioned instance of the remote extraction
//! capability, bound to a single navigable context. Sessions are stateful, so
//! each one is used by exactly one section and never concurrently.

use crate::extract::BackendError;
use crate::model::Section;
use async_trait::async_trait;
use serde_json::Value;

/// One extraction call
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// Absolute URL of the page to extract from
    pub target: &'a str,

    /// Natural-language instruction for the extractor
    pub instruction: &'a str,

    /// Expected payload shape (JSON Schema); `None` for schema-less calls
    pub schema: Option<&'a Value>,
}

/// A provisioned backend session
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extracts a best-effort payload from the target page
    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Value, BackendError>;

    /// Tears the session down
    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Provisions one backend session per section
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn provision(&self, section: &Section)
        -> Result<Box<dyn ExtractionBackend>, BackendError>;
}

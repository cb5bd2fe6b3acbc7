//! Record sinks
//!
//! A sink receives one normalized record per call, in discovery order. A
//! failing sink fails only the record it was handed.

use crate::model::PostDetail;
use crate::output::markdown::{document_path, render_post_document};
use crate::storage::{SharedStorage, StorageError, UpsertOutcome};
use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use thiserror::Error;

/// Errors raised while delivering a record
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Downstream consumer of normalized records
pub trait RecordSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn accept(&self, post: &PostDetail) -> Result<(), SinkError>;
}

/// Upserts records into the persistent store
pub struct StoreSink {
    storage: SharedStorage,
}

impl StoreSink {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }
}

impl RecordSink for StoreSink {
    fn name(&self) -> &'static str {
        "store"
    }

    fn accept(&self, post: &PostDetail) -> Result<(), SinkError> {
        let outcome = self
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .upsert_post(post)?;

        match outcome {
            UpsertOutcome::Inserted => tracing::debug!("Stored new post {}", post.url),
            UpsertOutcome::Updated => tracing::debug!("Updated post {}", post.url),
            UpsertOutcome::Unchanged => tracing::debug!("Post {} unchanged", post.url),
        }
        Ok(())
    }
}

/// Writes one markdown document per record below a root directory
#[derive(Debug, Clone)]
pub struct DocumentSink {
    root: PathBuf,
}

impl DocumentSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RecordSink for DocumentSink {
    fn name(&self) -> &'static str {
        "documents"
    }

    fn accept(&self, post: &PostDetail) -> Result<(), SinkError> {
        let path = document_path(&self.root, post);
        let io_error = |source| SinkError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&path, render_post_document(post)).map_err(io_error)?;

        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Forwards each record to every inner sink
///
/// All sinks are attempted even after one fails; the first error is returned.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl RecordSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn accept(&self, post: &PostDetail) -> Result<(), SinkError> {
        let mut first_error = None;

        for sink in &self.sinks {
            if let Err(e) = sink.accept(post) {
                tracing::warn!("Sink '{}' rejected {}: {}", sink.name(), post.url, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

//! Archive-Harvest: an incremental harvester for paginated content archives
//!
//! This crate walks the listing pages of each configured section, extracts one
//! structured record per discovered detail page through a remote extraction
//! backend, repairs loosely-shaped payloads, deduplicates across runs and
//! abandons a backend session once it stops producing anything useful.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Archive-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Extraction backend error: {0}")]
    Backend(#[from] extract::BackendError),

    #[error("Record sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid section transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SectionStatus,
        to: state::SectionStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Archive-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{PageTarget, PostDate, PostDetail, PostSummary, Section};
pub use state::{SectionStatus, SessionHealth};
pub use url::{canonicalize_url, is_usable_page_hint, is_usable_target};

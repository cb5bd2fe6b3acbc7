use serde::Deserialize;

/// Main configuration structure for Archive-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    pub backend: BackendConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionEntry>,
}

/// Crawl loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Maximum number of listing pages visited per section
    #[serde(rename = "max-pages-per-section", default = "default_max_pages")]
    pub max_pages_per_section: u32,

    /// Attempts per detail (and listing) extraction before giving up
    #[serde(rename = "max-detail-attempts", default = "default_max_attempts")]
    pub max_detail_attempts: u32,

    /// Backoff unit between retries (milliseconds); delay is attempt * unit
    #[serde(rename = "retry-backoff-ms", default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Consecutive session failures after which a backend session is abandoned
    #[serde(
        rename = "session-failure-threshold",
        default = "default_failure_threshold"
    )]
    pub session_failure_threshold: u32,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            max_pages_per_section: default_max_pages(),
            max_detail_attempts: default_max_attempts(),
            retry_backoff_ms: default_backoff_ms(),
            session_failure_threshold: default_failure_threshold(),
        }
    }
}

fn default_max_pages() -> u32 {
    50
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_failure_threshold() -> u32 {
    3
}

/// Remote extraction service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the extraction service
    pub endpoint: String,

    /// Bearer token sent with every request
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// HTTP timeout for a single backend call (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent presented to the extraction service
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("archive-harvest/{}", env!("CARGO_PKG_VERSION"))
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving one markdown document per record
    #[serde(rename = "documents-dir", default)]
    pub documents_dir: Option<String>,

    /// JSON-lines file receiving extraction metric events
    #[serde(rename = "telemetry-path", default)]
    pub telemetry_path: Option<String>,

    /// Markdown file receiving the run report
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

/// One content section to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct SectionEntry {
    /// Stable identifier, also used as the output namespace
    pub slug: String,

    /// Human-readable name (defaults to the slug)
    #[serde(default)]
    pub name: Option<String>,

    /// First listing page of the section
    #[serde(rename = "base-url")]
    pub base_url: String,
}

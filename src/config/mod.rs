//! Configuration module for Archive-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use archive_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Page budget per section: {}", config.harvester.max_pages_per_section);
//! ```

mod parser;
mod types;
mod validation;

use crate::model::Section;
use crate::ConfigError;

// Re-export types
pub use types::{BackendConfig, Config, HarvesterConfig, OutputConfig, SectionEntry};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

impl Config {
    /// Resolves the configured sections into validated `Section` values
    ///
    /// When `only` is non-empty, just the named sections are returned, in
    /// configuration order. Naming a slug that is not configured is an error.
    pub fn resolve_sections(&self, only: &[String]) -> Result<Vec<Section>, ConfigError> {
        for slug in only {
            if !self.sections.iter().any(|s| &s.slug == slug) {
                return Err(ConfigError::UnknownSection(slug.clone()));
            }
        }

        self.sections
            .iter()
            .filter(|entry| only.is_empty() || only.contains(&entry.slug))
            .map(|entry| {
                Section::new(
                    &entry.slug,
                    entry.name.as_deref().unwrap_or(&entry.slug),
                    &entry.base_url,
                )
                .map_err(|e| {
                    ConfigError::InvalidUrl(format!("Section '{}': {}", entry.slug, e))
                })
            })
            .collect()
    }
}

use crate::config::types::{BackendConfig, Config, HarvesterConfig, OutputConfig, SectionEntry};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_backend_config(&config.backend)?;
    validate_output_config(&config.output)?;
    validate_sections(&config.sections)?;
    Ok(())
}

/// Validates crawl loop limits
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.max_pages_per_section < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_section must be >= 1, got {}",
            config.max_pages_per_section
        )));
    }

    if config.max_detail_attempts < 1 || config.max_detail_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_detail_attempts must be between 1 and 10, got {}",
            config.max_detail_attempts
        )));
    }

    if config.session_failure_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "session_failure_threshold must be >= 1, got {}",
            config.session_failure_threshold
        )));
    }

    Ok(())
}

/// Validates the extraction service settings
fn validate_backend_config(config: &BackendConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.endpoint, "backend endpoint")?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "backend timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backend user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("documents_dir", &config.documents_dir),
        ("telemetry_path", &config.telemetry_path),
        ("summary_path", &config.summary_path),
    ] {
        if matches!(value, Some(v) if v.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                name
            )));
        }
    }

    Ok(())
}

/// Validates section entries
fn validate_sections(sections: &[SectionEntry]) -> Result<(), ConfigError> {
    if sections.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[section]] must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in sections {
        validate_slug(&entry.slug)?;

        if !seen.insert(entry.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate section slug '{}'",
                entry.slug
            )));
        }

        validate_http_url(&entry.base_url, &format!("base-url of '{}'", entry.slug))?;
    }

    Ok(())
}

/// Validates a section slug: non-empty, lowercase alphanumerics, '-' and '_'
fn validate_slug(slug: &str) -> Result<(), ConfigError> {
    if slug.is_empty() {
        return Err(ConfigError::Validation(
            "section slug cannot be empty".to_string(),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "section slug must contain only [a-z0-9-_], got '{}'",
            slug
        )));
    }

    Ok(())
}

/// Validates an absolute http(s) URL
fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}

//! Identifier Validator
//!
//! Decides whether a string handed back by the extraction backend can be used
//! as a page pointer at all. The backend sometimes returns an internal node
//! reference such as `"12"` or `"1093-4"` where a hyperlink was requested, so
//! pagination hints get an extra check against that fingerprint.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Classification of a candidate page pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetValidity {
    /// Absolute http(s) URL or site-relative path
    Usable,
    /// Present but not something we can navigate to
    Malformed,
    /// Missing or blank
    Absent,
}

impl TargetValidity {
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Usable)
    }
}

fn node_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(-\d+)?$").expect("node reference pattern is valid"))
}

/// Returns true when `candidate` looks like a backend node reference
///
/// Pure digits, or two digit runs joined by one hyphen.
pub fn is_node_reference(candidate: &str) -> bool {
    node_reference_pattern().is_match(candidate.trim())
}

/// Classifies a candidate detail or listing pointer
pub fn classify_target(candidate: Option<&str>) -> TargetValidity {
    let candidate = match candidate.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return TargetValidity::Absent,
    };

    if candidate.starts_with('/') {
        return TargetValidity::Usable;
    }

    match Url::parse(candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            TargetValidity::Usable
        }
        _ => TargetValidity::Malformed,
    }
}

/// Classifies a "next page" hint
///
/// Same as [`classify_target`], except that node references are always
/// malformed.
pub fn classify_page_hint(candidate: Option<&str>) -> TargetValidity {
    match candidate {
        Some(c) if is_node_reference(c) => TargetValidity::Malformed,
        _ => classify_target(candidate),
    }
}

/// General validator: non-empty absolute http(s) URL or path starting with `/`
pub fn is_usable_target(candidate: &str) -> bool {
    classify_target(Some(candidate)).is_usable()
}

/// Pagination variant of [`is_usable_target`] that also rejects node references
pub fn is_usable_page_hint(candidate: &str) -> bool {
    classify_page_hint(Some(candidate)).is_usable()
}

/// Resolves a usable candidate into an absolute URL against `base`
///
/// Returns `None` for anything the validator would not accept.
pub fn resolve_target(base: &Url, candidate: &str) -> Option<Url> {
    if !is_usable_target(candidate) {
        return None;
    }
    base.join(candidate.trim()).ok()
}

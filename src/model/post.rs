use serde::{Deserialize, Serialize};
use std::fmt;

/// Lightweight entry discovered on a listing page
///
/// Exists only to drive detail extraction; `url` is always absolute and
/// canonical by the time a summary is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub url: String,
    pub title: String,
    pub date: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// Publication date of a record
///
/// Date information is never discarded: text that could not be normalized is
/// kept verbatim as `Raw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PostDate {
    /// Canonical `YYYY-MM-DD` (optionally followed by a time component)
    Canonical(String),

    /// Original text the date normalizer could not understand
    Raw(String),
}

impl PostDate {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(s) | Self::Raw(s) => s,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical unit of output
///
/// Never mutated after creation; re-extraction produces a new value that
/// replaces the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    /// Identifier-safe slug, `[a-z0-9-_]` only
    pub slug: String,
    pub title: String,
    /// Canonical absolute URL, the record's identity
    pub url: String,
    pub date: Option<PostDate>,
    /// Slug of the section the record belongs to
    pub section: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub content: String,
}

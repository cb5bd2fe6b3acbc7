//! URL handling module for Archive-Harvest
//!
//! This module provides the Identifier Validator, URL canonicalization (the
//! identity used for deduplication and storage) and slug derivation.

mod canonical;
mod slug;
mod validate;

pub use canonical::canonicalize_url;
pub use slug::{derive_slug, sanitize_slug, slug_from_url};
pub use validate::{
    classify_page_hint, classify_target, is_node_reference, is_usable_page_hint,
    is_usable_target, resolve_target, TargetValidity,
};

use ::url::Url;

/// Resolves a usable candidate against `base` and canonicalizes the result
///
/// This is the single entry point used to turn backend-provided links into
/// record identities.
pub fn resolve_canonical(base: &Url, candidate: &str) -> Option<Url> {
    resolve_target(base, candidate).and_then(|url| canonicalize_url(url.as_str()).ok())
}

//! Dedup Set
//!
//! Canonical detail URLs already harvested or claimed during this run. One
//! set is shared by every section of a run, so a post cross-listed under two
//! sections is extracted once.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Run-scoped set of claimed detail URLs
///
/// Claims are never released within a run.
pub trait DedupSet: Send + Sync {
    /// Atomically checks and inserts `url`
    ///
    /// Returns true if the caller now owns the URL, false if it was already
    /// known or claimed.
    fn claim(&self, url: &str) -> bool;

    fn contains(&self, url: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutex-guarded [`DedupSet`]
#[derive(Debug, Default)]
pub struct SharedDedupSet {
    seen: Mutex<HashSet<String>>,
}

impl SharedDedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set pre-populated with identifiers from the store
    pub fn seeded<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            seen: Mutex::new(urls.into_iter().collect()),
        }
    }
}

impl DedupSet for SharedDedupSet {
    fn claim(&self, url: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string())
    }

    fn contains(&self, url: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

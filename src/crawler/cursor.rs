//! Pagination Cursor
//!
//! Decides which listing page comes next:
//!
//! | usable, unvisited hint | results on this page | next target |
//! |---|---|---|
//! | yes | any | the hint, made absolute |
//! | no | yes | `<base>page/<n+1>/` |
//! | no | no | done |
//!
//! A hint that points back at a page already produced for this section is
//! treated as unusable, so a backend repeating the same "next" link cannot
//! keep the section looping.

use crate::model::PageTarget;
use crate::url::{canonicalize_url, classify_page_hint, resolve_canonical, TargetValidity};
use std::collections::HashSet;
use url::Url;

/// Result of advancing the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStep {
    Next(PageTarget),
    Done,
}

/// Per-section pagination state
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    base: Url,
    current: u32,
    visited: HashSet<String>,
}

impl PaginationCursor {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            current: 0,
            visited: HashSet::new(),
        }
    }

    /// The section's first listing page
    pub fn first(&mut self) -> PageTarget {
        self.current = 1;
        let url = canonicalize_url(self.base.as_str()).unwrap_or_else(|_| self.base.clone());
        self.visited.insert(url.to_string());
        PageTarget::new(url, 1)
    }

    /// Number of the page most recently produced
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Advances past the current page
    ///
    /// `hint` is the raw "next page" value extracted from the current page and
    /// `had_results` whether that page yielded any summaries.
    pub fn next(&mut self, hint: Option<&str>, had_results: bool) -> CursorStep {
        let number = self.current + 1;

        if let Some(url) = self.follow_hint(hint) {
            return self.advance(url, number);
        }

        if !had_results {
            tracing::debug!("No usable hint and no results after page {}", self.current);
            return CursorStep::Done;
        }

        match self.sequential_url(number) {
            Some(url) if !self.visited.contains(url.as_str()) => {
                tracing::debug!("Falling back to sequential page {}", url);
                self.advance(url, number)
            }
            Some(url) => {
                tracing::debug!("Sequential page {} already visited", url);
                CursorStep::Done
            }
            None => CursorStep::Done,
        }
    }

    /// Sequential listing URL for page `number`: `<base>page/<number>/`
    pub fn sequential_url(&self, number: u32) -> Option<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);

        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/page/{}/", path, number));

        canonicalize_url(url.as_str()).ok()
    }

    fn follow_hint(&self, hint: Option<&str>) -> Option<Url> {
        match classify_page_hint(hint) {
            TargetValidity::Usable => {}
            TargetValidity::Malformed => {
                tracing::warn!(
                    "Rejected malformed next-page hint '{}' after page {}",
                    hint.unwrap_or_default(),
                    self.current
                );
                return None;
            }
            TargetValidity::Absent => return None,
        }

        let url = resolve_canonical(&self.base, hint?)?;
        if self.visited.contains(url.as_str()) {
            tracing::warn!("Next-page hint {} points at a visited page, ignoring", url);
            return None;
        }
        Some(url)
    }

    fn advance(&mut self, url: Url, number: u32) -> CursorStep {
        self.current = number;
        self.visited.insert(url.to_string());
        CursorStep::Next(PageTarget::new(url, number))
    }
}

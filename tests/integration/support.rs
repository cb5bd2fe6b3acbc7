//! Shared fixtures: a scripted extraction backend and an in-memory store

use archive_harvest::crawler::{CrawlSettings, Harvester, RetryPolicy};
use archive_harvest::extract::{
    BackendError, BackendProvider, ExtractionBackend, ExtractionRequest,
};
use archive_harvest::model::Section;
use archive_harvest::output::StoreSink;
use archive_harvest::storage::{SharedStorage, SqliteStorage};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned responses keyed by target URL
///
/// The last response queued for a URL repeats forever. Unknown URLs fail
/// permanently.
#[derive(Default)]
pub struct Script {
    responses: Mutex<HashMap<String, Vec<Result<Value, BackendError>>>>,
    calls: Mutex<Vec<String>>,
}

impl Script {
    pub fn on(self, target: &str, response: Result<Value, BackendError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push(response);
        self
    }

    /// Extraction calls made for `target`, diagnostics included
    pub fn calls_to(&self, target: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == target).count()
    }

    fn answer(&self, target: &str) -> Result<Value, BackendError> {
        self.calls.lock().unwrap().push(target.to_string());
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(target) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(BackendError::InvalidResponse(format!("no script for {}", target))),
        }
    }
}

/// Hands every section a session backed by the same script
#[derive(Clone)]
pub struct ScriptedProvider {
    pub script: Arc<Script>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
        }
    }
}

struct ScriptedSession(Arc<Script>);

#[async_trait]
impl ExtractionBackend for ScriptedSession {
    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Value, BackendError> {
        self.0.answer(request.target)
    }
}

#[async_trait]
impl BackendProvider for ScriptedProvider {
    async fn provision(
        &self,
        _section: &Section,
    ) -> Result<Box<dyn ExtractionBackend>, BackendError> {
        Ok(Box::new(ScriptedSession(Arc::clone(&self.script))))
    }
}

pub fn news() -> Section {
    Section::new("news", "News", "https://example.com/news/").unwrap()
}

pub fn blog() -> Section {
    Section::new("blog", "Blog", "https://example.com/blog/").unwrap()
}

pub fn settings(max_pages: u32) -> CrawlSettings {
    CrawlSettings {
        max_pages,
        retry: RetryPolicy::new(3, Duration::ZERO),
        session_failure_threshold: 3,
    }
}

pub fn memory_storage() -> SharedStorage {
    Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()))
}

/// A harvester storing into `storage`
pub fn harvester(
    provider: &ScriptedProvider,
    storage: &SharedStorage,
    sections: Vec<Section>,
    max_pages: u32,
) -> Harvester {
    Harvester::new(
        settings(max_pages),
        sections,
        Box::new(provider.clone()),
        Arc::clone(storage),
        Box::new(StoreSink::new(Arc::clone(storage))),
    )
}

/// Listing payload linking to `paths` (relative to the host)
pub fn listing(paths: &[&str], next: Option<&str>) -> Result<Value, BackendError> {
    let posts: Vec<Value> = paths
        .iter()
        .map(|p| json!({ "url": p, "title": p.trim_matches('/') }))
        .collect();
    Ok(json!({ "posts": posts, "next_page_url": next }))
}

pub fn detail(section: &str, slug: &str) -> Result<Value, BackendError> {
    Ok(json!({
        "slug": slug,
        "title": format!("Post {}", slug),
        "url": format!("https://example.com/{}/{}/", section, slug),
        "date": "2023-03-05",
        "section": section,
        "categories": ["general"],
        "tags": [],
        "content": format!("Body of {}", slug)
    }))
}

pub fn session_error() -> Result<Value, BackendError> {
    Err(BackendError::Http {
        status: 500,
        message: "Session has completed or timed out".to_string(),
    })
}

//! Full harvest through the HTTP extraction backend and a mock service

use archive_harvest::config::BackendConfig;
use archive_harvest::crawler::{CrawlSettings, Harvester, RetryPolicy};
use archive_harvest::extract::{ExtractionKind, HttpBackendProvider};
use archive_harvest::model::Section;
use archive_harvest::output::{MemoryTelemetry, StoreSink, TelemetryEvent};
use archive_harvest::state::SectionStatus;
use archive_harvest::storage::{SharedStorage, SqliteStorage};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "https://archive.example.org/news/";

fn backend_config(endpoint: String) -> BackendConfig {
    BackendConfig {
        endpoint,
        api_key: None,
        timeout_secs: 5,
        user_agent: "archive-harvest-tests".to_string(),
    }
}

async fn mock_extract(server: &MockServer, target: &str, data: serde_json::Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/sessions/s1/extract"))
        .and(body_partial_json(json!({ "url": target })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_harvest_over_http_backend() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "s1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/sessions/s1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    mock_extract(
        &server,
        BASE,
        json!({
            "posts": [{ "url": "/news/first-post/?utm_source=feed", "title": "First post" }],
            "next_page_url": null
        }),
        1,
    )
    .await;
    mock_extract(
        &server,
        "https://archive.example.org/news/first-post/",
        json!({
            "slug": "first-post",
            "title": "First post",
            "url": "https://archive.example.org/news/first-post/",
            "date": "2023-03-05",
            "section": "news",
            "categories": ["announcements"],
            "tags": ["launch"],
            "content": "Hello."
        }),
        1,
    )
    .await;
    // Listing extraction plus the diagnostic capture of the empty page
    mock_extract(
        &server,
        "https://archive.example.org/news/page/2/",
        json!({ "posts": [] }),
        2,
    )
    .await;

    let provider = HttpBackendProvider::new(&backend_config(server.uri())).unwrap();
    let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let telemetry = Arc::new(MemoryTelemetry::new());

    let harvester = Harvester::new(
        CrawlSettings {
            max_pages: 5,
            retry: RetryPolicy::new(3, Duration::ZERO),
            session_failure_threshold: 3,
        },
        vec![Section::new("news", "News", BASE).unwrap()],
        Box::new(provider),
        Arc::clone(&storage),
        Box::new(StoreSink::new(Arc::clone(&storage))),
    )
    .with_telemetry(Box::new(Arc::clone(&telemetry)));

    let report = harvester.run().await.unwrap();

    let section = report.section("news").unwrap();
    assert_eq!(section.status, SectionStatus::Complete);
    assert_eq!(section.pages_visited, 2);
    assert_eq!(section.saved, 1);

    let post = storage
        .lock()
        .unwrap()
        .get_post_by_url("https://archive.example.org/news/first-post/")
        .unwrap()
        .unwrap();
    assert_eq!(post.slug, "first-post");
    assert_eq!(post.tags, vec!["launch"]);

    let events = telemetry.events();
    let extraction_kinds: Vec<ExtractionKind> = events
        .iter()
        .filter_map(|e| match e {
            TelemetryEvent::Extraction(metric) => Some(metric.kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        extraction_kinds,
        vec![
            ExtractionKind::Listing,
            ExtractionKind::Detail,
            ExtractionKind::Listing,
            ExtractionKind::Diagnostic
        ]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, TelemetryEvent::Diagnostic(capture) if capture.preview.is_some())));
    assert!(matches!(
        events.last(),
        Some(TelemetryEvent::RunFinished { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_service_aborts_sections() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpBackendProvider::new(&backend_config(server.uri())).unwrap();
    let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));

    let harvester = Harvester::new(
        CrawlSettings::default(),
        vec![Section::new("news", "News", BASE).unwrap()],
        Box::new(provider),
        Arc::clone(&storage),
        Box::new(StoreSink::new(Arc::clone(&storage))),
    );

    let report = harvester.run().await.unwrap();

    assert_eq!(
        report.section("news").unwrap().status,
        SectionStatus::ErrorAborted
    );
    assert_eq!(report.pages_visited(), 0);
}

//! End-to-end harvest runs against a scripted backend

use crate::support::{
    blog, detail, harvester, listing, memory_storage, news, session_error, Script,
    ScriptedProvider,
};
use archive_harvest::model::PostDetail;
use archive_harvest::output::ErrorKind;
use archive_harvest::state::SectionStatus;
use archive_harvest::storage::RunStatus;
use serde_json::json;

const NEWS: &str = "https://example.com/news/";
const NEWS_PAGE_2: &str = "https://example.com/news/page/2/";
const BLOG: &str = "https://example.com/blog/";
const BLOG_PAGE_2: &str = "https://example.com/blog/page/2/";

#[tokio::test]
async fn test_known_posts_skipped_within_page_budget() {
    let storage = memory_storage();
    storage
        .lock()
        .unwrap()
        .upsert_post(&PostDetail {
            slug: "old".to_string(),
            title: "Old".to_string(),
            url: "https://example.com/news/old/".to_string(),
            date: None,
            section: "news".to_string(),
            categories: vec![],
            tags: vec![],
            content: "from an earlier run".to_string(),
        })
        .unwrap();

    let provider = ScriptedProvider::new(
        Script::default()
            .on(NEWS, listing(&["/news/old/", "/news/a/"], None))
            .on(
                NEWS_PAGE_2,
                listing(&["/news/a/", "/news/b/"], Some("/news/page/3/")),
            )
            .on("https://example.com/news/a/", detail("news", "a"))
            .on("https://example.com/news/b/", detail("news", "b")),
    );

    let report = harvester(&provider, &storage, vec![news()], 2)
        .run()
        .await
        .unwrap();

    let section = report.section("news").unwrap();
    assert_eq!(section.status, SectionStatus::Complete);
    assert_eq!(section.pages_visited, 2);
    assert_eq!(section.summaries_discovered, 4);
    assert_eq!(section.duplicates_skipped, 2);
    assert_eq!(section.saved, 2);

    let script = &provider.script;
    assert_eq!(script.calls_to("https://example.com/news/old/"), 0);
    assert_eq!(script.calls_to("https://example.com/news/a/"), 1);
    assert_eq!(script.calls_to("https://example.com/news/b/"), 1);
    assert_eq!(script.calls_to("https://example.com/news/page/3/"), 0);

    assert_eq!(storage.lock().unwrap().count_posts().unwrap(), 3);
}

#[tokio::test]
async fn test_session_exhaustion_ends_only_that_section() {
    let storage = memory_storage();
    let provider = ScriptedProvider::new(
        Script::default()
            .on(
                NEWS,
                listing(&["/news/a/", "/news/b/", "/news/c/", "/news/d/"], None),
            )
            .on("https://example.com/news/a/", session_error())
            .on("https://example.com/news/b/", session_error())
            .on("https://example.com/news/c/", session_error())
            .on("https://example.com/news/d/", session_error())
            .on(BLOG, listing(&["/blog/x/"], None))
            .on(BLOG_PAGE_2, listing(&[], None))
            .on("https://example.com/blog/x/", detail("blog", "x")),
    );

    let report = harvester(&provider, &storage, vec![news(), blog()], 10)
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);

    let news_report = report.section("news").unwrap();
    assert_eq!(news_report.status, SectionStatus::BackendExhausted);
    assert_eq!(news_report.failed, 3);
    assert_eq!(news_report.error_count(ErrorKind::SessionError), 3);

    let script = &provider.script;
    assert_eq!(script.calls_to("https://example.com/news/a/"), 3);
    assert_eq!(script.calls_to("https://example.com/news/c/"), 3);
    assert_eq!(script.calls_to("https://example.com/news/d/"), 0);
    assert_eq!(script.calls_to(NEWS_PAGE_2), 0);

    let blog_report = report.section("blog").unwrap();
    assert_eq!(blog_report.status, SectionStatus::Complete);
    assert_eq!(blog_report.saved, 1);

    let stored = storage
        .lock()
        .unwrap()
        .get_section_reports(report.run_id.unwrap())
        .unwrap();
    let stored_news = stored.iter().find(|r| r.section == "news").unwrap();
    assert_eq!(stored_news.status, SectionStatus::BackendExhausted);
    assert_eq!(stored_news.failed, 3);
}

#[tokio::test]
async fn test_success_between_session_failures_keeps_section_alive() {
    let storage = memory_storage();
    let provider = ScriptedProvider::new(
        Script::default()
            .on(
                NEWS,
                listing(
                    &["/news/a/", "/news/b/", "/news/ok/", "/news/c/", "/news/d/"],
                    None,
                ),
            )
            .on(NEWS_PAGE_2, listing(&[], None))
            .on("https://example.com/news/a/", session_error())
            .on("https://example.com/news/b/", session_error())
            .on("https://example.com/news/ok/", detail("news", "ok"))
            .on("https://example.com/news/c/", session_error())
            .on("https://example.com/news/d/", session_error()),
    );

    let report = harvester(&provider, &storage, vec![news()], 10)
        .run()
        .await
        .unwrap();

    let section = report.section("news").unwrap();
    assert_eq!(section.status, SectionStatus::Complete);
    assert_eq!(section.saved, 1);
    assert_eq!(section.failed, 4);
    assert_eq!(provider.script.calls_to("https://example.com/news/d/"), 3);
}

#[tokio::test]
async fn test_rerun_is_incremental_and_idempotent() {
    let storage = memory_storage();
    let provider = ScriptedProvider::new(
        Script::default()
            .on(NEWS, listing(&["/news/a/", "/news/b/"], None))
            .on(NEWS_PAGE_2, listing(&[], None))
            .on("https://example.com/news/a/", detail("news", "a"))
            .on("https://example.com/news/b/", detail("news", "b")),
    );

    let first = harvester(&provider, &storage, vec![news()], 10)
        .run()
        .await
        .unwrap();
    assert_eq!(first.saved(), 2);

    let second = harvester(&provider, &storage, vec![news()], 10)
        .run()
        .await
        .unwrap();
    assert_eq!(second.saved(), 0);
    assert_eq!(second.section("news").unwrap().duplicates_skipped, 2);
    assert_eq!(provider.script.calls_to("https://example.com/news/a/"), 1);

    let fresh = harvester(&provider, &storage, vec![news()], 10)
        .fresh(true)
        .run()
        .await
        .unwrap();
    assert_eq!(fresh.saved(), 2);
    assert_eq!(provider.script.calls_to("https://example.com/news/a/"), 2);

    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_posts().unwrap(), 2);
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, fresh.run_id.unwrap());
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_loose_payloads_are_repaired_and_bad_links_rejected() {
    let storage = memory_storage();
    let provider = ScriptedProvider::new(
        Script::default()
            .on(
                NEWS,
                listing(&["/news/loose/", "mailto:editor@example.com", "1093-4"], None),
            )
            .on(NEWS_PAGE_2, listing(&[], None))
            .on(
                "https://example.com/news/loose/",
                Ok(json!({
                    "data": {
                        "headline": "Loosely shaped",
                        "published": "March 5th, 2023",
                        "body": "text"
                    }
                })),
            ),
    );

    let report = harvester(&provider, &storage, vec![news()], 10)
        .run()
        .await
        .unwrap();

    let section = report.section("news").unwrap();
    assert_eq!(section.rejected_entries, 2);
    assert_eq!(section.saved, 1);
    assert_eq!(section.repaired, 1);

    let post = storage
        .lock()
        .unwrap()
        .get_post_by_url("https://example.com/news/loose/")
        .unwrap()
        .unwrap();
    assert_eq!(post.title, "Loosely shaped");
    assert_eq!(post.section, "news");
    assert_eq!(post.content, "text");
}

#[tokio::test]
async fn test_known_and_new_post_with_next_hint_to_empty_page() {
    let storage = memory_storage();
    storage
        .lock()
        .unwrap()
        .upsert_post(&PostDetail {
            slug: "known".to_string(),
            title: "Known".to_string(),
            url: "https://example.com/news/known/".to_string(),
            date: None,
            section: "news".to_string(),
            categories: vec![],
            tags: vec![],
            content: "already stored".to_string(),
        })
        .unwrap();

    let provider = ScriptedProvider::new(
        Script::default()
            .on(
                NEWS,
                listing(&["/news/known/", "/news/new/"], Some("/news/page/2/")),
            )
            .on(NEWS_PAGE_2, Ok(json!({ "posts": [], "next_page_url": null })))
            .on("https://example.com/news/new/", detail("news", "new")),
    );

    let report = harvester(&provider, &storage, vec![news()], 10)
        .run()
        .await
        .unwrap();

    let section = report.section("news").unwrap();
    assert_eq!(section.status, SectionStatus::Complete);
    assert_eq!(section.pages_visited, 2);
    assert_eq!(section.saved, 1);
    assert_eq!(section.duplicates_skipped, 1);

    let script = &provider.script;
    assert_eq!(script.calls_to("https://example.com/news/known/"), 0);
    assert_eq!(script.calls_to("https://example.com/news/new/"), 1);
    assert_eq!(script.calls_to("https://example.com/news/page/3/"), 0);
}

#[tokio::test]
async fn test_post_listed_in_two_sections_is_extracted_once() {
    let storage = memory_storage();
    let shared = "https://example.com/shared/cross-post/";
    let provider = ScriptedProvider::new(
        Script::default()
            .on(NEWS, listing(&["/shared/cross-post/"], None))
            .on(NEWS_PAGE_2, listing(&[], None))
            .on(BLOG, listing(&["/shared/cross-post/", "/blog/own/"], None))
            .on(BLOG_PAGE_2, listing(&[], None))
            .on(shared, detail("news", "cross-post"))
            .on("https://example.com/blog/own/", detail("blog", "own")),
    );

    let report = harvester(&provider, &storage, vec![news(), blog()], 10)
        .run()
        .await
        .unwrap();

    assert_eq!(provider.script.calls_to(shared), 1);
    assert_eq!(report.section("news").unwrap().saved, 1);

    let blog_report = report.section("blog").unwrap();
    assert_eq!(blog_report.duplicates_skipped, 1);
    assert_eq!(blog_report.saved, 1);

    assert_eq!(storage.lock().unwrap().count_posts().unwrap(), 2);
}

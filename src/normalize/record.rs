//! Record Normalizer
//!
//! The only place that deals with whatever shape the extraction backend
//! returned. A payload is first checked against the strict expected shape; if
//! that fails, fields are picked out leniently (renamed keys, wrong types,
//! envelopes) and deterministic defaults fill the gaps, so a page is never
//! lost to a shape mismatch.

use crate::model::{PostDate, PostDetail, PostSummary, Section};
use crate::normalize::date::normalize_date;
use crate::url::{derive_slug, resolve_canonical, sanitize_slug};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

const SLUG_KEYS: &[&str] = &["slug"];
const TITLE_KEYS: &[&str] = &["title", "name", "headline"];
const URL_KEYS: &[&str] = &["url", "link", "href", "permalink"];
const DATE_KEYS: &[&str] = &[
    "date",
    "published",
    "published_at",
    "publish_date",
    "date_published",
    "datePublished",
];
const SECTION_KEYS: &[&str] = &["section", "section_slug"];
const CATEGORY_KEYS: &[&str] = &["categories", "category"];
const TAG_KEYS: &[&str] = &["tags", "tag", "keywords"];
const CONTENT_KEYS: &[&str] = &["content", "body", "text", "markdown", "content_markdown"];
const ENVELOPE_KEYS: &[&str] = &["data", "post", "record", "result"];
const ENTRY_KEYS: &[&str] = &["posts", "items", "articles", "entries", "summaries", "results"];
const HINT_KEYS: &[&str] = &["next_page_url", "next_page", "nextPageUrl", "next_url", "next"];

/// Outcome of normalizing a payload
///
/// `Repaired` values were rebuilt from a payload that failed the strict shape
/// check and should not be treated as fully trustworthy.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Valid(T),
    Repaired(T),
}

impl<T> Normalized<T> {
    pub fn is_repaired(&self) -> bool {
        matches!(self, Self::Repaired(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Valid(v) | Self::Repaired(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Valid(v) | Self::Repaired(v) => v,
        }
    }
}

/// Fallback context for a detail payload
#[derive(Debug, Clone, Copy)]
pub struct DetailContext<'a> {
    /// Canonical URL the extraction was requested for
    pub requested_url: &'a str,
    pub section: &'a Section,
}

/// Listing page contents after validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    /// Entries with usable, canonical URLs, in listing order
    pub summaries: Vec<PostSummary>,

    /// Raw "next page" hint; the pagination cursor decides whether to trust it
    pub next_hint: Option<String>,

    /// Entries dropped because their URL was missing or malformed
    pub rejected: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DetailPayload {
    slug: String,
    title: String,
    url: String,
    #[serde(default)]
    date: Option<String>,
    section: String,
    categories: Vec<String>,
    tags: Vec<String>,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ListingPayload {
    posts: Vec<SummaryPayload>,
    #[serde(default)]
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    url: String,
    title: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Normalizes a detail-page payload into a `PostDetail`
///
/// The record's URL is always the requested canonical URL: it is the identity
/// the Dedup Set and store already know the page by.
pub fn normalize_detail(payload: &Value, ctx: DetailContext<'_>) -> Normalized<PostDetail> {
    match DetailPayload::deserialize(payload) {
        Ok(strict) => {
            if strict.url != ctx.requested_url {
                tracing::debug!(
                    "Backend reported url {} for {}, keeping the requested one",
                    strict.url,
                    ctx.requested_url
                );
            }
            Normalized::Valid(PostDetail {
                slug: slug_or_default(Some(strict.slug), ctx.requested_url),
                title: non_empty(strict.title)
                    .unwrap_or_else(|| default_title(ctx.requested_url)),
                url: ctx.requested_url.to_string(),
                date: finish_date(strict.date, ctx.requested_url),
                section: non_empty(strict.section).unwrap_or_else(|| ctx.section.slug.clone()),
                categories: clean_list(strict.categories),
                tags: clean_list(strict.tags),
                content: strict.content,
            })
        }
        Err(e) => {
            tracing::debug!(
                "Detail payload for {} failed shape check ({}), repairing",
                ctx.requested_url,
                e
            );
            Normalized::Repaired(repair_detail(payload, ctx))
        }
    }
}

fn repair_detail(payload: &Value, ctx: DetailContext<'_>) -> PostDetail {
    let empty = Map::new();
    let obj = unwrap_envelope(payload).unwrap_or(&empty);

    PostDetail {
        slug: slug_or_default(get_str(obj, SLUG_KEYS), ctx.requested_url),
        title: get_str(obj, TITLE_KEYS).unwrap_or_else(|| default_title(ctx.requested_url)),
        url: ctx.requested_url.to_string(),
        date: finish_date(get_str(obj, DATE_KEYS), ctx.requested_url),
        section: get_str(obj, SECTION_KEYS).unwrap_or_else(|| ctx.section.slug.clone()),
        categories: get_list(obj, CATEGORY_KEYS),
        tags: get_list(obj, TAG_KEYS),
        content: get_str(obj, CONTENT_KEYS).unwrap_or_default(),
    }
}

/// Normalizes a listing-page payload
///
/// Entry URLs are resolved against `base` and canonicalized; entries whose URL
/// fails the Identifier Validator are dropped and reported in `rejected`.
pub fn normalize_listing(payload: &Value, base: &Url) -> Normalized<ListingPage> {
    match ListingPayload::deserialize(payload) {
        Ok(strict) => {
            let mut page = ListingPage {
                next_hint: strict.next_page_url.and_then(non_empty),
                ..ListingPage::default()
            };
            for entry in strict.posts {
                push_summary(
                    &mut page,
                    base,
                    Some(entry.url),
                    Some(entry.title),
                    entry.date,
                    clean_list(entry.categories),
                    clean_list(entry.tags),
                );
            }
            Normalized::Valid(page)
        }
        Err(e) => {
            tracing::debug!("Listing payload for {} failed shape check ({}), repairing", base, e);
            Normalized::Repaired(repair_listing(payload, base))
        }
    }
}

fn repair_listing(payload: &Value, base: &Url) -> ListingPage {
    let mut page = ListingPage::default();

    let (entries, container) = match payload {
        Value::Array(items) => (items.as_slice(), None),
        Value::Object(obj) => {
            let container = unwrap_envelope(payload).unwrap_or(obj);
            let entries = ENTRY_KEYS
                .iter()
                .find_map(|key| container.get(*key).and_then(Value::as_array))
                .map(Vec::as_slice)
                .unwrap_or_default();
            (entries, Some(container))
        }
        _ => (&[][..], None),
    };

    page.next_hint = container.and_then(|c| get_scalar_text(c, HINT_KEYS));

    for entry in entries {
        match entry {
            Value::Object(obj) => push_summary(
                &mut page,
                base,
                get_str(obj, URL_KEYS),
                get_str(obj, TITLE_KEYS),
                get_str(obj, DATE_KEYS),
                get_list(obj, CATEGORY_KEYS),
                get_list(obj, TAG_KEYS),
            ),
            // A bare string entry can only be a link
            Value::String(link) => push_summary(
                &mut page,
                base,
                Some(link.clone()),
                None,
                None,
                Vec::new(),
                Vec::new(),
            ),
            other => page.rejected.push(other.to_string()),
        }
    }

    page
}

fn push_summary(
    page: &mut ListingPage,
    base: &Url,
    url: Option<String>,
    title: Option<String>,
    date: Option<String>,
    categories: Vec<String>,
    tags: Vec<String>,
) {
    let raw = url.unwrap_or_default();
    let Some(resolved) = resolve_canonical(base, &raw) else {
        tracing::warn!("Dropping listing entry with unusable url '{}' on {}", raw, base);
        page.rejected.push(raw);
        return;
    };

    let url = resolved.to_string();
    page.summaries.push(PostSummary {
        title: title
            .and_then(non_empty)
            .unwrap_or_else(|| default_title(&url)),
        url,
        date: date.and_then(non_empty),
        categories,
        tags,
    });
}

/// Runs the Date Normalizer, keeping the raw text when it cannot be parsed
fn finish_date(raw: Option<String>, url: &str) -> Option<PostDate> {
    let raw = raw.and_then(non_empty)?;
    match normalize_date(&raw) {
        Some(date) => Some(PostDate::Canonical(date)),
        None => {
            tracing::warn!("Could not normalize date '{}' for {}", raw, url);
            Some(PostDate::Raw(raw))
        }
    }
}

fn slug_or_default(candidate: Option<String>, url: &str) -> String {
    candidate
        .map(|s| sanitize_slug(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| derive_slug(url))
}

/// Title fallback: the URL's slug, or the URL itself
fn default_title(url: &str) -> String {
    crate::url::slug_from_url(url).unwrap_or_else(|| url.to_string())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items.into_iter().filter_map(non_empty).collect()
}

/// Returns the object holding the record, looking through common envelopes
fn unwrap_envelope(payload: &Value) -> Option<&Map<String, Value>> {
    match payload {
        Value::Object(obj) => Some(
            ENVELOPE_KEYS
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_object))
                .unwrap_or(obj),
        ),
        Value::Array(items) => items.iter().find_map(Value::as_object),
        _ => None,
    }
}

/// First non-empty string value among `keys`
fn get_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .and_then(non_empty)
    })
}

/// Like [`get_str`] but numbers are rendered as text
///
/// Used for pagination hints, where a number is the tell-tale of a node
/// reference that the validator must get to see.
fn get_scalar_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) => non_empty(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// String list under the first present key among `keys`
///
/// Accepts an array of strings, an array of `{ "name": ... }` objects, or a
/// single comma-separated string.
fn get_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|key| obj.get(*key)) else {
        return Vec::new();
    };

    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => non_empty(s.clone()),
                Value::Object(o) => get_str(o, &["name", "title", "label"]),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|part| non_empty(part.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

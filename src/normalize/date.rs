//! Date Normalizer
//!
//! Turns free-form publication dates into `YYYY-MM-DD`. Rules are applied in
//! order and the first that succeeds wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Formats tried by the generic parse, date-only
const DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%b. %d %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%A %B %d %Y",
    "%a %b %d %Y",
];

/// Formats tried by the generic parse, naive date-times (taken as UTC)
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%m/%d/%Y %H:%M", "%B %d %Y %H:%M"];

struct Patterns {
    canonical: Regex,
    ordinal: Regex,
    month_day_year: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        canonical: Regex::new(r"^\d{4}-\d{2}-\d{2}([T ].*)?$").expect("valid pattern"),
        ordinal: Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid pattern"),
        month_day_year: Regex::new(r"(?i)\b([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})\b")
            .expect("valid pattern"),
    })
}

/// Normalizes free-form date text into `YYYY-MM-DD`
///
/// Returns `None` when nothing matches; callers keep the original text as a
/// raw fallback so date information is never lost.
///
/// # Examples
///
/// ```
/// use archive_harvest::normalize::normalize_date;
///
/// assert_eq!(normalize_date("December 26th, 2025").as_deref(), Some("2025-12-26"));
/// assert_eq!(normalize_date("2025-12-26").as_deref(), Some("2025-12-26"));
/// assert_eq!(normalize_date("not a date"), None);
/// ```
pub fn normalize_date(text: &str) -> Option<String> {
    let patterns = patterns();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // 1. Already canonical, possibly with a time component
    if patterns.canonical.is_match(text) {
        return Some(text.to_string());
    }

    // 2. Strip ordinal suffixes
    let cleaned = patterns.ordinal.replace_all(text, "$1");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    // 3. "<MonthName> <Day>[,] <Year>", anywhere in the text
    if let Some(date) = parse_month_day_year(&patterns.month_day_year, &cleaned) {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    // 4. Generic calendar-aware parse
    generic_parse(&cleaned).map(|date| date.format("%Y-%m-%d").to_string())
}

/// First match whose month is a full month name and whose day exists
fn parse_month_day_year(pattern: &Regex, text: &str) -> Option<NaiveDate> {
    pattern.captures_iter(text).find_map(|caps| {
        let month_name = caps.get(1)?.as_str().to_lowercase();
        let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Tries RFC 3339, RFC 2822 and a list of common layouts
///
/// Zoned timestamps are converted to their UTC calendar date.
fn generic_parse(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    // Commas carry no information for the layouts below
    let text = text.replace(',', "");

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
                .map(|dt| dt.date())
        })
}

use sha2::{Digest, Sha256};
use url::Url;

/// Restricts text to an identifier-safe slug: lower-case `[a-z0-9-_]`
///
/// Whitespace becomes `-`; every other character outside the alphabet is
/// dropped.
pub fn sanitize_slug(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => Some(c),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        })
        .collect()
}

/// Derives a slug from the last non-empty path segment of `url`
///
/// Returns `None` when no segment survives sanitizing, e.g. for a site root.
pub fn slug_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(sanitize_slug)
        .filter(|slug| !slug.is_empty())
}

/// Derives a slug for `url`, falling back to a short content hash
///
/// The fallback keeps slugs unique per URL when the path carries nothing
/// usable.
pub fn derive_slug(url: &str) -> String {
    slug_from_url(url).unwrap_or_else(|| {
        let digest = Sha256::digest(url.as_bytes());
        format!("post-{}", &hex::encode(digest)[..12])
    })
}

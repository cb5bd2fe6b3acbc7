use crate::{UrlError, UrlResult};
use url::Url;

/// Query parameters that never contribute to a record's identity
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "mc_cid",
    "mc_eid",
    "ref",
    "replytocom",
];

/// Canonicalizes an absolute detail or listing URL
///
/// Canonical URLs are the identity of a record: the Dedup Set and the store
/// are both keyed by them, so two spellings of the same page must collapse to
/// one string.
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject anything that is not absolute http(s) with a host
/// 2. Host is lower-cased and a default port dropped (done by the parser)
/// 3. Collapse repeated slashes in the path, keeping a trailing slash
/// 4. Remove the fragment
/// 5. Remove tracking query parameters (`utm_*` and friends)
/// 6. Sort the remaining query parameters; drop an empty query
///
/// # Examples
///
/// ```
/// use archive_harvest::url::canonicalize_url;
///
/// let url = canonicalize_url("https://EXAMPLE.com//news/post-1/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news/post-1/");
/// ```
pub fn canonicalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let path = collapse_slashes(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collapses runs of '/' into one, preserving leading and trailing slashes
fn collapse_slashes(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if path.ends_with('/') {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts the rest by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme_and_trailing_slash() {
        let result = canonicalize_url("http://example.com/news/post/").unwrap();
        assert_eq!(result.as_str(), "http://example.com/news/post/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = canonicalize_url("https://example.com/page#comments").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = canonicalize_url("https://example.com/page?utm_source=twitter").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = canonicalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_mixed_query_params() {
        let result = canonicalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?another=value&keep=yes"
        );
    }

    #[test]
    fn test_lowercase_host_and_default_port() {
        let result = canonicalize_url("https://EXAMPLE.COM:443/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = canonicalize_url("https://example.com///path//to///page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page/");
    }

    #[test]
    fn test_dot_segments_resolved() {
        let result = canonicalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = canonicalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = canonicalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(canonicalize_url("not a url").is_err());
        assert!(canonicalize_url("/relative/path").is_err());
    }
}

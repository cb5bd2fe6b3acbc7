use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// A named content partition harvested independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Stable identifier and output namespace
    pub slug: String,

    /// Human-readable name used in instructions and reports
    pub name: String,

    /// First listing page of the section
    pub base_url: Url,
}

impl Section {
    /// Creates a section from its configured values
    ///
    /// The base URL must be an absolute http(s) URL.
    pub fn new(slug: &str, name: &str, base_url: &str) -> UrlResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base_url.scheme().to_string()));
        }
        if base_url.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }

        Ok(Self {
            slug: slug.to_string(),
            name: name.to_string(),
            base_url,
        })
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug)
    }
}

/// A resolved listing page together with its 1-based position in the section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    pub url: Url,
    pub number: u32,
}

impl PageTarget {
    pub fn new(url: Url, number: u32) -> Self {
        Self { url, number }
    }
}

impl fmt::Display for PageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} ({})", self.number, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_new() {
        let section = Section::new("news", "News", "https://example.com/news/").unwrap();
        assert_eq!(section.slug, "news");
        assert_eq!(section.base_url.as_str(), "https://example.com/news/");
        assert_eq!(section.to_string(), "news");
    }

    #[test]
    fn test_section_rejects_bad_urls() {
        assert!(Section::new("news", "News", "/news/").is_err());
        assert!(matches!(
            Section::new("news", "News", "ftp://example.com/news/"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_page_target_display() {
        let target = PageTarget::new(Url::parse("https://example.com/news/page/2/").unwrap(), 2);
        assert_eq!(target.to_string(), "page 2 (https://example.com/news/page/2/)");
    }
}

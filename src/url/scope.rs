//! Crawl scope and link resolution
//!
//! A crawl is confined to the seed's host and path prefix. Every link found on
//! a page goes through [`CrawlScope::resolve`], which either produces the
//! canonical absolute URL to crawl next or rejects the link.

use crate::url::host_key;
use crate::UrlError;
use url::{ParseError, Url};

/// The host + path-prefix boundary of a crawl
///
/// Built once from the seed URL and never mutated afterwards, so it can be
/// shared freely between workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    /// Seed URL rewritten into directory form (`.../prefix/`), used as the base
    /// for relative references
    base: Url,

    /// Lowercase host with optional non-default port
    host: String,

    /// Path prefix without a trailing slash; empty for the site root
    prefix: String,
}

impl CrawlScope {
    /// Builds the scope from a seed URL
    ///
    /// A trailing slash on the seed path does not matter: `https://a.com/docs`
    /// and `https://a.com/docs/` describe the same scope.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlScope)` - Scope rooted at the seed
    /// * `Err(UrlError)` - The seed is not an http(s) URL with a host
    pub fn from_seed(seed: &Url) -> Result<Self, UrlError> {
        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                seed.scheme()
            )));
        }

        let host = host_key(seed).ok_or(UrlError::MissingHost)?;
        let prefix = seed.path().trim_end_matches('/').to_string();

        let mut base = seed.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.set_path(&format!("{}/", prefix));

        Ok(Self { base, host, prefix })
    }

    /// Parses a seed string and builds the scope from it
    pub fn parse(seed: &str) -> Result<(Url, Self), UrlError> {
        let url = Url::parse(seed).map_err(|e| UrlError::Parse(format!("{}: {}", seed, e)))?;
        let scope = Self::from_seed(&url)?;
        Ok((url, scope))
    }

    /// The host key this scope is confined to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The path prefix this scope is confined to (`/` for the site root)
    pub fn path_prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Resolves a raw `href` against the scope
    ///
    /// Absolute links are accepted when they point at the scope host and under
    /// the path prefix. Relative links are resolved against the scope base
    /// (treated as a directory) and then checked the same way. Empty and
    /// fragment-only links point back at the current page and are rejected,
    /// as is anything that fails to parse.
    ///
    /// The returned URL never carries a fragment.
    ///
    /// # Examples
    ///
    /// ```
    /// use scope_crawler::url::CrawlScope;
    ///
    /// let (_, scope) = CrawlScope::parse("https://example.com/a/b").unwrap();
    /// let url = scope.resolve("def").unwrap();
    /// assert_eq!(url.as_str(), "https://example.com/a/b/def");
    /// assert!(scope.resolve("/elsewhere").is_none());
    /// ```
    pub fn resolve(&self, raw: &str) -> Option<Url> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return None;
        }

        let mut candidate = match Url::parse(raw) {
            Ok(url) => url,
            Err(ParseError::RelativeUrlWithoutBase) => self.base.join(raw).ok()?,
            Err(_) => return None,
        };

        // Scheme-relative references (`//host/path`) resolve to another host,
        // so the host check applies to relative links as well.
        if !self.contains(&candidate) {
            return None;
        }

        candidate.set_fragment(None);
        Some(candidate)
    }

    /// Returns true if an absolute URL lies inside the scope
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        match host_key(url) {
            Some(host) if host == self.host => path_within(&self.prefix, url.path()),
            _ => false,
        }
    }
}

/// Segment-aware prefix check: `/a` covers `/a`, `/a/` and `/a/x`, not `/abc`
fn path_within(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

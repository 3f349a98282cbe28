//! Page fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification
//! - Persisting each fetched page under the destination directory

use crate::config::HttpConfig;
use crate::url::host_key;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors a page fetch can end with
///
/// All of them are per-task failures: the task stops, its siblings carry on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}")]
    Unreachable { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Body of {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: usize },

    #[error("Cannot derive a storage path for {url}")]
    NoStoragePath { url: String },

    #[error("Failed to store {url} at {}: {source}", path.display())]
    Storage {
        url: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Fetches a page and persists its body
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, stores the body under `destination` and returns it
    async fn fetch(&self, url: &Url, destination: &Path) -> Result<String, FetchError>;
}

/// Default fetcher backed by a reqwest client
///
/// Bodies are stored byte for byte; the returned text is a lossy UTF-8
/// decoding used only for link extraction.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Creates a fetcher with a client built from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_body_bytes: crate::config::CrawlerConfig::default().max_document_bytes,
        })
    }

    /// Sets the largest body the fetcher will download
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    fn too_large(&self, url: &Url) -> FetchError {
        FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, destination: &Path) -> Result<String, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        // Read in chunks so an oversized body without Content-Length stops early.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(url, e))? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        let path = store_page(destination, url, &body).await?;
        tracing::debug!("Stored {} ({} bytes) at {}", url, body.len(), path.display());

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use scope_crawler::config::HttpConfig;
/// use scope_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent())
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .gzip(true)
        .brotli(true)
        .build()
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Unreachable { url }
    } else {
        FetchError::Http { url, source: error }
    }
}

/// Derives where a page is stored under `destination`
///
/// The layout is `<destination>/<host[:port]>/<path>`. A path ending in `/`
/// (including the site root) maps to `index.html` inside that directory;
/// any other path gets an `.html` suffix. The query string is not part of
/// the path.
///
/// # Returns
///
/// * `Some(PathBuf)` - The file the page body is written to
/// * `None` - The URL has no host
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use scope_crawler::crawler::page_path;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/blog/post").unwrap();
/// assert_eq!(
///     page_path(Path::new("out"), &url),
///     Some(PathBuf::from("out/example.com/blog/post.html"))
/// );
/// ```
pub fn page_path(destination: &Path, url: &Url) -> Option<PathBuf> {
    let mut path = destination.join(host_key(url)?);

    let segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    match segments.split_last() {
        Some((last, dirs)) if !url.path().ends_with('/') => {
            path.extend(dirs);
            path.push(format!("{}.html", last));
        }
        _ => {
            path.extend(&segments);
            path.push("index.html");
        }
    }

    Some(path)
}

/// Writes a page body to its storage path, creating directories as needed
pub async fn store_page(destination: &Path, url: &Url, body: &[u8]) -> Result<PathBuf, FetchError> {
    let path = page_path(destination, url).ok_or_else(|| FetchError::NoStoragePath {
        url: url.to_string(),
    })?;

    let storage_error = |source| FetchError::Storage {
        url: url.to_string(),
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(storage_error)?;
    }
    tokio::fs::write(&path, body).await.map_err(storage_error)?;

    Ok(path)
}

use serde::Deserialize;

/// Main configuration structure for Scope-Crawler
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Crawl engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of worker tasks pulling from the frontier
    pub workers: u32,

    /// How long a cancelled crawl waits for running tasks (milliseconds)
    #[serde(rename = "shutdown-grace-ms")]
    pub shutdown_grace_ms: u64,

    /// Largest page body handed to the link extractor (bytes)
    #[serde(rename = "max-document-bytes")]
    pub max_document_bytes: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            shutdown_grace_ms: 5_000,
            max_document_bytes: 10 * 1024 * 1024,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Name of the crawler, sent in the User-Agent header
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler, sent in the User-Agent header
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Whole-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Connection establishment timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl HttpConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version` or `CrawlerName/Version (+ContactURL)`
    pub fn user_agent(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

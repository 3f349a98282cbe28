//! HTML link extraction
//!
//! The extractor only collects raw `href` values. Deciding which of them are
//! worth crawling is the scope's job, not the parser's.

use scraper::{Html, Selector};
use thiserror::Error;

/// Errors link extraction can end with
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Document of {size} bytes exceeds the {limit} byte extraction limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Pulls raw hyperlinks out of a page body
pub trait LinkExtractor: Send + Sync {
    /// Returns every `href` found on anchor elements, in document order,
    /// unfiltered and unresolved
    fn extract_links(&self, html: &str) -> Result<Vec<String>, ExtractError>;
}

/// Default extractor backed by scraper's HTML5 parser
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    max_document_bytes: usize,
}

impl HtmlLinkExtractor {
    /// Creates an extractor that refuses documents above the given size
    pub fn new(max_document_bytes: usize) -> Self {
        Self { max_document_bytes }
    }
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self::new(crate::config::CrawlerConfig::default().max_document_bytes)
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    /// # Example
    ///
    /// ```
    /// use scope_crawler::crawler::{HtmlLinkExtractor, LinkExtractor};
    ///
    /// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
    /// let links = HtmlLinkExtractor::default().extract_links(html).unwrap();
    /// assert_eq!(links, vec!["/page".to_string()]);
    /// ```
    fn extract_links(&self, html: &str) -> Result<Vec<String>, ExtractError> {
        if html.len() > self.max_document_bytes {
            return Err(ExtractError::TooLarge {
                size: html.len(),
                limit: self.max_document_bytes,
            });
        }

        let selector =
            Selector::parse("a[href]").map_err(|e| ExtractError::Selector(format!("{:?}", e)))?;
        let document = Html::parse_document(html);

        let links = document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect();

        Ok(links)
    }
}

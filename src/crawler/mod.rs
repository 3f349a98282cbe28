//! Crawler module for scoped page fetching and link following
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and on-disk page storage
//! - HTML parsing and link extraction
//! - The worker pool, frontier and in-flight accounting
//! - Result streaming and cancellation

mod cancel;
mod engine;
mod fetcher;
mod frontier;
mod in_flight;
mod parser;
mod results;
mod task;

pub use cancel::{shutdown_signal, CancellationController};
pub use engine::{CrawlEngine, CrawlHandle, CrawlOutcome, CrawlReport};
pub use fetcher::{build_http_client, page_path, store_page, FetchError, HttpFetcher, PageFetcher};
pub use frontier::Frontier;
pub use in_flight::InFlight;
pub use parser::{ExtractError, HtmlLinkExtractor, LinkExtractor};
pub use results::{result_channel, ResultPublisher, ResultStream};

use crate::config::Config;
use crate::url::CrawlScope;
use crate::CrawlError;
use std::path::PathBuf;

/// Runs a complete crawl and collects its results
///
/// This is the simplest entry point. It will:
/// 1. Validate the configuration and derive the scope from the seed URL
/// 2. Build the HTTP fetcher from the configuration
/// 3. Crawl every in-scope page reachable from the seed
/// 4. Return the crawled URLs in completion order
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seed` - Absolute http(s) URL to start from
/// * `destination` - Directory pages are stored under
///
/// # Returns
///
/// * `Ok((urls, report))` - Crawl finished
/// * `Err(CrawlError)` - The configuration or seed is invalid, or the HTTP client could not be built
pub async fn crawl(
    config: &Config,
    seed: &str,
    destination: impl Into<PathBuf>,
) -> Result<(Vec<String>, CrawlReport), CrawlError> {
    crate::config::validate(config)?;
    let (seed, scope) = CrawlScope::parse(seed)?;
    let (handle, results) = CrawlEngine::from_config(config, scope, destination)?.start(seed)?;

    let urls = results.collect().await;
    let report = handle.join().await;

    Ok((urls, report))
}

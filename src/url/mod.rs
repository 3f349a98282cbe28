//! URL handling module for Scope-Crawler
//!
//! This module provides the crawl scope, link resolution against it, and
//! host-key extraction.

mod domain;
mod scope;

pub use domain::host_key;
pub use scope::CrawlScope;

//! Output module for crawl reporting
//!
//! This module handles recording crawl statistics and printing the end-of-run
//! summary.

pub mod stats;

pub use stats::{print_summary, CrawlStatistics, CrawlStats, CrawlSummary};

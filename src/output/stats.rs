//! Crawl statistics
//!
//! Counters are updated lock-free by the workers while the crawl runs; a
//! [`CrawlSummary`] is a point-in-time copy suitable for reporting.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by every task of one crawl
#[derive(Debug, Default)]
pub struct CrawlStats {
    claimed: AtomicU64,
    skipped: AtomicU64,
    published: AtomicU64,
    fetch_failures: AtomicU64,
    extract_failures: AtomicU64,
    links_found: AtomicU64,
    links_accepted: AtomicU64,
    links_rejected: AtomicU64,
    abandoned: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_claimed(&self) {
        self.claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extract_failure(&self) {
        self.extract_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links_found(&self, count: usize) {
        self.links_found.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_link_accepted(&self) {
        self.links_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_link_rejected(&self) {
        self.links_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: usize) {
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Copies the current counter values
    pub fn snapshot(&self) -> CrawlStatistics {
        CrawlStatistics {
            claimed: self.claimed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            extract_failures: self.extract_failures.load(Ordering::Relaxed),
            links_found: self.links_found.load(Ordering::Relaxed),
            links_accepted: self.links_accepted.load(Ordering::Relaxed),
            links_rejected: self.links_rejected.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Crawl statistics at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Tasks that won the claim for their URL
    pub claimed: u64,

    /// Tasks whose URL was already claimed
    pub skipped: u64,

    /// URLs delivered on the result stream
    pub published: u64,

    /// Tasks that ended with a fetch error
    pub fetch_failures: u64,

    /// Tasks that ended with an extraction error
    pub extract_failures: u64,

    /// Raw links returned by the extractor
    pub links_found: u64,

    /// Links the scope accepted
    pub links_accepted: u64,

    /// Links the scope rejected
    pub links_rejected: u64,

    /// Queued tasks dropped by cancellation before they started
    pub abandoned: u64,
}

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: CrawlStatistics,
}

impl CrawlSummary {
    /// Wall-clock duration of the run in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Prints a crawl summary to stderr
///
/// Stdout carries the crawled URLs, so the summary stays out of it.
pub fn print_summary(summary: &CrawlSummary) {
    let stats = &summary.stats;

    eprintln!("=== Crawl Summary ===\n");
    eprintln!("Seed: {}", summary.seed);
    eprintln!("Started: {}", summary.started_at.to_rfc3339());
    eprintln!("Finished: {}", summary.finished_at.to_rfc3339());
    eprintln!("Duration: {:.1}s", summary.duration_ms() as f64 / 1000.0);
    eprintln!();

    eprintln!("Pages:");
    eprintln!("  Claimed: {}", stats.claimed);
    eprintln!("  Published: {}", stats.published);
    eprintln!("  Duplicate claims skipped: {}", stats.skipped);
    eprintln!("  Fetch failures: {}", stats.fetch_failures);
    eprintln!("  Extraction failures: {}", stats.extract_failures);
    if stats.abandoned > 0 {
        eprintln!("  Abandoned on cancellation: {}", stats.abandoned);
    }
    eprintln!();

    eprintln!("Links:");
    eprintln!("  Found: {}", stats.links_found);
    eprintln!("  In scope: {}", stats.links_accepted);
    eprintln!("  Out of scope or malformed: {}", stats.links_rejected);
    eprintln!();

    let success_rate = if stats.claimed > 0 {
        (stats.published as f64 / stats.claimed as f64) * 100.0
    } else {
        0.0
    };
    eprintln!(
        "Success Rate: {:.1}% ({} / {} claimed pages published)",
        success_rate, stats.published, stats.claimed
    );
}

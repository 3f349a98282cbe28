//! Thread-safe set of URLs already claimed for crawling

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Set of URLs that have been claimed by a crawl task
///
/// Membership is monotonic: there is no removal. Crawl tasks only go through
/// [`VisitedSet::claim`], whose single critical section performs both the
/// membership check and the insert, so at most one task ever wins a URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts the URL if absent
    ///
    /// # Returns
    ///
    /// * `true` - The caller won the claim and owns the fetch for this URL
    /// * `false` - Another caller claimed the URL first
    pub fn claim(&self, url: &Url) -> bool {
        self.lock().insert(url.as_str().to_string())
    }

    /// Returns true if the URL has been claimed or inserted
    pub fn contains(&self, url: &Url) -> bool {
        self.lock().contains(url.as_str())
    }

    /// Marks the URL as visited; inserting twice is a no-op
    pub fn insert(&self, url: &Url) {
        self.lock().insert(url.as_str().to_string());
    }

    /// Number of URLs claimed so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

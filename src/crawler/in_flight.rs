//! In-flight task counter with a "reached zero" notification

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Counts crawl tasks that have not reached a terminal state
///
/// Works like a wait-group: a task is added before it is queued and marked
/// done once it has reported. The counter dropping to zero is the only signal
/// that a crawl has run out of work.
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
    zero: Notify,
}

impl InFlight {
    /// Creates a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more task
    pub fn add(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks one task as finished
    ///
    /// # Returns
    ///
    /// `true` if this call moved the counter from one to zero
    pub fn done(&self) -> bool {
        let previous = self.count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "InFlight::done called more often than add");

        if previous == 1 {
            self.zero.notify_waiters();
            true
        } else {
            false
        }
    }

    /// Current number of registered tasks
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Waits until the counter is zero
    pub async fn wait_zero(&self) {
        loop {
            let notified = self.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `done` cannot slip between.
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }

            notified.await;
        }
    }
}

//! Work queue feeding the worker pool
//!
//! The frontier is unbounded so a worker that schedules children can never
//! block on a full queue while every other worker does the same. Its length
//! stays bounded in practice because children that are already visited never
//! get queued.

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Queue of URLs waiting for a worker
pub struct Frontier {
    tx: mpsc::UnboundedSender<Url>,
    rx: Mutex<mpsc::UnboundedReceiver<Url>>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Adds a URL to the back of the queue
    ///
    /// # Returns
    ///
    /// `false` if the queue no longer accepts work
    pub fn push(&self, url: Url) -> bool {
        self.tx.send(url).is_ok()
    }

    /// Waits for the next URL
    ///
    /// Returns `None` as soon as `shutdown` fires, even if URLs are still
    /// queued; those are left for [`Frontier::drain`].
    pub async fn next(&self, shutdown: &CancellationToken) -> Option<Url> {
        let mut rx = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return None,
            rx = self.rx.lock() => rx,
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            url = rx.recv() => url,
        }
    }

    /// Removes every queued URL without handing it to a worker
    ///
    /// # Returns
    ///
    /// The number of URLs removed
    pub async fn drain(&self) -> usize {
        let mut rx = self.rx.lock().await;
        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

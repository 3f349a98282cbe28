//! Result stream: hand-off of crawled URLs to the caller

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Creates a connected publisher/stream pair
pub fn result_channel() -> (ResultPublisher, ResultStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ResultPublisher {
            tx: Mutex::new(Some(tx)),
        },
        ResultStream { rx },
    )
}

/// Sending half, shared by every crawl task
///
/// The stream is closed exactly once, by whichever of crawl completion or
/// cancellation gets there first. Publishing after that is a no-op.
#[derive(Debug)]
pub struct ResultPublisher {
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl ResultPublisher {
    /// Publishes a crawled URL
    ///
    /// # Returns
    ///
    /// `false` if the stream is already closed or the consumer went away
    pub fn publish(&self, url: String) -> bool {
        match self.lock().as_ref() {
            Some(tx) => tx.send(url).is_ok(),
            None => false,
        }
    }

    /// Closes the stream
    ///
    /// # Returns
    ///
    /// `true` for the call that actually closed it
    pub fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    /// Returns true once the stream has been closed
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving half, handed to the caller of a crawl
///
/// Yields URLs in publish order and returns `None` once the crawl has
/// finished or been cancelled and everything already published was read.
#[derive(Debug)]
pub struct ResultStream {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ResultStream {
    /// Receives the next crawled URL
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Drains the stream until it closes
    pub async fn collect(mut self) -> Vec<String> {
        let mut urls = Vec::new();
        while let Some(url) = self.recv().await {
            urls.push(url);
        }
        urls
    }
}

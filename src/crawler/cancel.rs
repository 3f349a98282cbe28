//! Cancellation driver for a running crawl

use crate::crawler::engine::{CrawlHandle, CrawlReport};
use std::future::Future;

/// Runs a crawl until it completes or an external stop future resolves
pub struct CancellationController {
    handle: CrawlHandle,
}

impl CancellationController {
    pub fn new(handle: CrawlHandle) -> Self {
        Self { handle }
    }

    /// Drives the crawl to its end
    ///
    /// If `stop` resolves first the crawl is shut down gracefully; the
    /// returned report says whether running tasks drained in time.
    pub async fn run<F>(self, stop: F) -> CrawlReport
    where
        F: Future<Output = ()>,
    {
        let token = self.handle.cancellation_token();

        let stopped = tokio::select! {
            _ = self.handle.completed() => false,
            _ = token.cancelled() => false,
            _ = stop => true,
        };

        if stopped {
            tracing::info!("Received stop request, shutting down crawl");
            self.handle.shutdown().await
        } else {
            self.handle.join().await
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where available
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

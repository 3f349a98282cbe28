//! Crawl engine - task lifecycle and termination detection
//!
//! This module owns everything one crawl shares between its tasks:
//! - The scope, the visited set and the two collaborators
//! - The frontier feeding a fixed pool of worker tasks
//! - The in-flight counter whose drop to zero ends the crawl
//! - The result publisher and the cancellation token

use crate::config::Config;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::in_flight::InFlight;
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::results::{result_channel, ResultPublisher, ResultStream};
use crate::crawler::task::CrawlTask;
use crate::output::{CrawlStatistics, CrawlStats, CrawlSummary};
use crate::state::VisitedSet;
use crate::url::CrawlScope;
use crate::{CrawlError, UrlError};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// State shared by every task of one crawl
///
/// One context per crawl; nothing here is process-wide, so independent
/// crawls can run side by side.
pub(crate) struct CrawlContext {
    pub(crate) scope: CrawlScope,
    pub(crate) destination: PathBuf,
    pub(crate) visited: VisitedSet,
    pub(crate) fetcher: Arc<dyn PageFetcher>,
    pub(crate) extractor: Arc<dyn LinkExtractor>,
    pub(crate) frontier: Frontier,
    pub(crate) in_flight: InFlight,
    pub(crate) results: ResultPublisher,
    /// Cooperative stop requested by the caller
    pub(crate) cancel: CancellationToken,
    /// Retires idle workers; child of `cancel`, also fired on completion
    pub(crate) shutdown: CancellationToken,
    pub(crate) stats: CrawlStats,
    seed: String,
    started_at: DateTime<Utc>,
}

impl CrawlContext {
    /// Queues a task for `url`
    ///
    /// The counter goes up before the task becomes visible to any worker, so
    /// it can never touch zero while work is still pending.
    pub(crate) fn schedule(&self, url: Url) {
        self.in_flight.add();
        if !self.frontier.push(url) {
            self.finish_task();
        }
    }

    /// Counts one task down and ends the crawl if it was the last one
    pub(crate) fn finish_task(&self) {
        if self.in_flight.done() {
            if self.results.close() {
                tracing::info!("Crawl of {} complete: no tasks left in flight", self.seed);
            }
            self.shutdown.cancel();
        }
    }

    fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            seed: self.seed.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats: self.stats.snapshot(),
        }
    }
}

/// Builder and entry point for a crawl
pub struct CrawlEngine {
    scope: CrawlScope,
    destination: PathBuf,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    workers: usize,
    shutdown_grace: Duration,
}

impl CrawlEngine {
    /// Creates an engine with explicit collaborators
    ///
    /// Worker count and shutdown grace start from the configuration defaults.
    pub fn new(
        scope: CrawlScope,
        destination: impl Into<PathBuf>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        let defaults = crate::config::CrawlerConfig::default();
        Self {
            scope,
            destination: destination.into(),
            fetcher,
            extractor,
            workers: defaults.workers as usize,
            shutdown_grace: Duration::from_millis(defaults.shutdown_grace_ms),
        }
    }

    /// Creates an engine with the HTTP fetcher and HTML extractor
    pub fn from_config(
        config: &Config,
        scope: CrawlScope,
        destination: impl Into<PathBuf>,
    ) -> Result<Self, CrawlError> {
        let fetcher =
            HttpFetcher::new(&config.http)?.with_max_body_bytes(config.crawler.max_document_bytes);
        let extractor = HtmlLinkExtractor::new(config.crawler.max_document_bytes);

        Ok(
            Self::new(scope, destination, Arc::new(fetcher), Arc::new(extractor))
                .with_workers(config.crawler.workers as usize)
                .with_shutdown_grace(Duration::from_millis(config.crawler.shutdown_grace_ms)),
        )
    }

    /// Sets the worker pool size (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets how long a cancelled crawl waits for running tasks
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn scope(&self) -> &CrawlScope {
        &self.scope
    }

    /// Seeds the crawl and starts the worker pool
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok((CrawlHandle, ResultStream))` - Control handle and the stream of crawled URLs
    /// * `Err(CrawlError)` - The seed lies outside the engine's scope
    pub fn start(self, mut seed: Url) -> Result<(CrawlHandle, ResultStream), CrawlError> {
        seed.set_fragment(None);
        if !self.scope.contains(&seed) {
            return Err(UrlError::OutOfScope(seed.to_string()).into());
        }

        let (results, stream) = result_channel();
        let cancel = CancellationToken::new();
        let shutdown = cancel.child_token();

        let ctx = Arc::new(CrawlContext {
            scope: self.scope,
            destination: self.destination,
            visited: VisitedSet::new(),
            fetcher: self.fetcher,
            extractor: self.extractor,
            frontier: Frontier::new(),
            in_flight: InFlight::new(),
            results,
            cancel,
            shutdown,
            stats: CrawlStats::new(),
            seed: seed.to_string(),
            started_at: Utc::now(),
        });

        tracing::info!(
            "Starting crawl of {} (scope {}{}) with {} worker(s)",
            seed,
            ctx.scope.host(),
            ctx.scope.path_prefix(),
            self.workers
        );
        ctx.schedule(seed);

        let workers = (0..self.workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&ctx))))
            .collect();

        Ok((
            CrawlHandle {
                ctx,
                workers,
                shutdown_grace: self.shutdown_grace,
            },
            stream,
        ))
    }
}

/// Pulls tasks off the frontier until the crawl completes or is cancelled
async fn run_worker(id: usize, ctx: Arc<CrawlContext>) {
    tracing::trace!("Worker {} started", id);

    while let Some(url) = ctx.frontier.next(&ctx.shutdown).await {
        let task_ctx = Arc::clone(&ctx);
        let task = tokio::spawn(async move { CrawlTask::new(url).run(&task_ctx).await });

        // A panicking task never reported, so it is counted down here.
        if let Err(e) = task.await {
            tracing::error!("Crawl task panicked on worker {}: {}", id, e);
            ctx.finish_task();
        }
    }

    tracing::trace!("Worker {} stopped", id);
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The in-flight counter reached zero
    Completed,

    /// The crawl was stopped early
    Cancelled {
        /// Whether every running task finished within the grace period
        drained: bool,
        /// Queued tasks dropped without being started
        abandoned: usize,
    },
}

/// Outcome plus statistics of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub summary: CrawlSummary,
}

/// Control handle for a running crawl
pub struct CrawlHandle {
    ctx: Arc<CrawlContext>,
    workers: Vec<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl CrawlHandle {
    /// Token that stops the crawl when cancelled
    ///
    /// Cancelling it has the same effect as [`CrawlHandle::cancel`] except
    /// that the result stream is closed by whoever joins the crawl.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Requests a cooperative stop
    ///
    /// Closes the result stream right away and stops tasks from scheduling
    /// further children. Fetches already under way are left to finish.
    pub fn cancel(&self) {
        if self.ctx.results.close() {
            tracing::info!("Cancellation requested; result stream closed");
        }
        self.ctx.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.cancel.is_cancelled()
    }

    /// Number of tasks not yet in a terminal state
    pub fn in_flight(&self) -> usize {
        self.ctx.in_flight.count()
    }

    /// Number of URLs claimed so far
    pub fn visited(&self) -> usize {
        self.ctx.visited.len()
    }

    /// Current statistics
    pub fn stats(&self) -> CrawlStatistics {
        self.ctx.stats.snapshot()
    }

    /// Resolves once no task is in flight
    pub async fn completed(&self) {
        self.ctx.in_flight.wait_zero().await
    }

    /// Waits for the crawl to end
    ///
    /// Runs to natural completion, or performs [`CrawlHandle::shutdown`] if
    /// the cancellation token fires first.
    pub async fn join(mut self) -> CrawlReport {
        let cancelled = tokio::select! {
            _ = self.ctx.in_flight.wait_zero() => false,
            _ = self.ctx.cancel.cancelled() => true,
        };

        if cancelled {
            return self.shutdown().await;
        }

        self.join_workers().await;
        self.report(CrawlOutcome::Completed)
    }

    /// Cancels the crawl and waits, up to the grace period, for running tasks
    ///
    /// Tasks still queued when the workers stop are abandoned and counted
    /// down without being started.
    pub async fn shutdown(mut self) -> CrawlReport {
        self.cancel();

        let grace = self.shutdown_grace;
        let drained = tokio::time::timeout(grace, self.join_workers())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(
                "Shutdown grace period of {:?} elapsed with {} task(s) still running",
                grace,
                self.in_flight()
            );
        }

        let abandoned = self.ctx.frontier.drain().await;
        if abandoned > 0 {
            tracing::info!("Abandoned {} queued task(s)", abandoned);
            self.ctx.stats.record_abandoned(abandoned);
            for _ in 0..abandoned {
                self.ctx.finish_task();
            }
        }

        self.report(CrawlOutcome::Cancelled { drained, abandoned })
    }

    async fn join_workers(&mut self) {
        for worker in std::mem::take(&mut self.workers) {
            if let Err(e) = worker.await {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }
    }

    fn report(&self, outcome: CrawlOutcome) -> CrawlReport {
        CrawlReport {
            outcome,
            summary: self.ctx.summary(),
        }
    }
}

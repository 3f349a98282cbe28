//! A single crawl task: claim, fetch, extract, schedule children, report

use crate::crawler::engine::CrawlContext;
use crate::state::TaskState;
use crate::CrawlError;
use std::collections::HashSet;
use url::Url;

/// Unit of work for one URL
pub(crate) struct CrawlTask {
    url: Url,
    state: TaskState,
}

impl CrawlTask {
    pub(crate) fn new(url: Url) -> Self {
        Self {
            url,
            state: TaskState::Pending,
        }
    }

    /// Runs the task to completion and reports it
    ///
    /// Always counts the task down, whatever happened on the way.
    pub(crate) async fn run(mut self, ctx: &CrawlContext) {
        if let Err(e) = self.execute(ctx).await {
            tracing::error!("Crawl task for {} aborted: {}", self.url, e);
        }
        self.report(ctx);
    }

    async fn execute(&mut self, ctx: &CrawlContext) -> Result<(), CrawlError> {
        self.advance(TaskState::Claiming)?;
        if !ctx.visited.claim(&self.url) {
            ctx.stats.record_skipped();
            return self.advance(TaskState::Skipped);
        }
        ctx.stats.record_claimed();

        self.advance(TaskState::Fetching)?;
        tracing::debug!("Crawling: {}", self.url);
        let body = match ctx.fetcher.fetch(&self.url, &ctx.destination).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", self.url, e);
                ctx.stats.record_fetch_failure();
                return self.advance(TaskState::Failed);
            }
        };

        self.advance(TaskState::Extracting)?;
        let links = match ctx.extractor.extract_links(&body) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("Link extraction failed for {}: {}", self.url, e);
                ctx.stats.record_extract_failure();
                return self.advance(TaskState::Failed);
            }
        };

        self.advance(TaskState::Spawning)?;
        self.schedule_children(ctx, &links);

        self.advance(TaskState::Done)
    }

    fn schedule_children(&self, ctx: &CrawlContext, links: &[String]) {
        if ctx.cancel.is_cancelled() {
            tracing::debug!(
                "Cancellation requested; not following {} link(s) from {}",
                links.len(),
                self.url
            );
            return;
        }

        ctx.stats.record_links_found(links.len());

        let mut seen = HashSet::new();
        let mut scheduled = 0;
        for raw in links {
            let Some(child) = ctx.scope.resolve(raw) else {
                ctx.stats.record_link_rejected();
                tracing::trace!("Rejected link {:?} on {}", raw, self.url);
                continue;
            };
            ctx.stats.record_link_accepted();

            // Cheap pre-filter only; the child's own claim is authoritative.
            if ctx.visited.contains(&child) || !seen.insert(child.as_str().to_string()) {
                continue;
            }

            ctx.schedule(child);
            scheduled += 1;
        }

        tracing::debug!(
            "{}: {} link(s) found, {} scheduled",
            self.url,
            links.len(),
            scheduled
        );
    }

    fn report(mut self, ctx: &CrawlContext) {
        if self.state == TaskState::Done {
            if ctx.results.publish(self.url.to_string()) {
                ctx.stats.record_published();
            } else {
                tracing::debug!("Result stream closed; dropping {}", self.url);
            }
        }

        if let Err(e) = self.advance(TaskState::Reported) {
            tracing::error!("{}", e);
        }
        ctx.finish_task();
    }

    fn advance(&mut self, next: TaskState) -> Result<(), CrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
        Ok(())
    }
}

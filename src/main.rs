//! Scope-Crawler main entry point
//!
//! This is the command-line interface for the scoped site crawler.

use anyhow::Context;
use clap::Parser;
use scope_crawler::config::{load_config_with_hash, Config};
use scope_crawler::crawler::{shutdown_signal, CancellationController, CrawlEngine, CrawlOutcome};
use scope_crawler::output::print_summary;
use scope_crawler::CrawlScope;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scope-Crawler: crawl one site section and mirror it to disk
///
/// Every page under the starting URL's host and path prefix is fetched once,
/// stored under the destination directory, and its URL printed to stdout.
#[derive(Parser, Debug)]
#[command(name = "scope-crawler")]
#[command(version)]
#[command(about = "A scoped, concurrent site crawler", long_about = None)]
struct Cli {
    /// Absolute http(s) URL to start from; also defines the crawl scope
    #[arg(value_name = "STARTING_URL")]
    starting_url: String,

    /// Directory crawled pages are written to
    #[arg(value_name = "DESTINATION")]
    destination: PathBuf,

    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent workers (overrides the configuration file)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(&cli)?;

    let (seed, scope) = CrawlScope::parse(&cli.starting_url)
        .with_context(|| format!("Invalid starting URL: {}", cli.starting_url))?;

    let engine = CrawlEngine::from_config(&config, scope, &cli.destination)
        .context("Failed to set up the crawler")?;
    let (handle, mut results) = engine.start(seed)?;

    tracing::info!("Writing pages to: {}", cli.destination.display());

    let controller = tokio::spawn(CancellationController::new(handle).run(shutdown_signal()));

    while let Some(url) = results.recv().await {
        println!("{}", url);
    }

    let report = controller.await.context("Crawl controller task failed")?;
    match report.outcome {
        CrawlOutcome::Completed => tracing::info!("Crawl completed successfully"),
        CrawlOutcome::Cancelled { drained, abandoned } => tracing::warn!(
            "Crawl cancelled ({} queued task(s) abandoned{})",
            abandoned,
            if drained { "" } else { ", some fetches still running" }
        ),
    }

    if !cli.quiet {
        print_summary(&report.summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout is reserved for crawled URLs.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scope_crawler=info,warn"),
            1 => EnvFilter::new("scope_crawler=debug,info"),
            2 => EnvFilter::new("scope_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one was given and applies CLI overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    match cli.workers {
        Some(workers) => Ok(config.with_workers(workers)?),
        None => Ok(config),
    }
}

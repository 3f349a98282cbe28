//! Configuration module for Scope-Crawler
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so a crawl can run without one.
//!
//! # Example
//!
//! ```no_run
//! use scope_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig};
pub use validation::{validate, MAX_WORKERS};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

impl Config {
    /// Overrides the worker count and re-validates the crawler section
    pub fn with_workers(mut self, workers: u32) -> crate::ConfigResult<Self> {
        self.crawler.workers = workers;
        validation::validate_crawler_config(&self.crawler)?;
        Ok(self)
    }
}

//! realty-scout - Real estate listings monitor
//!
//! Polls a listings API for configured regions, cities and property
//! categories, drops unwanted ads, remembers every listing it has reported,
//! and mails a spreadsheet plus an interactive map of the new ones.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - TOML configuration and validation
//! - [`crawler`] - Listings API client, fetch orchestration and the job pipeline
//! - [`listing`] - Per-category filter policy and payload normalizer
//! - [`models`] - Raw ads and canonical listings
//! - [`storage`] - Listing store (SQLite and in-memory)
//! - [`report`] - Spreadsheet and HTML map generation
//! - [`notifications`] - Email delivery
//! - [`scheduler`] - Daily run times
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use realty_scout::config::Config;
//! use realty_scout::crawler::pipeline::JobRunner;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::load(Path::new("config.toml"))?);
//!     let runner = JobRunner::from_config(config)?;
//!     let summary = runner.run().await;
//!     println!("{} new listings", summary.total_new());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod listing;
pub mod models;
pub mod notifications;
pub mod report;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::pipeline::{JobRunner, JobSummary};
    pub use crate::crawler::{AdsApiClient, AdsSource, Crawler};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{CanonicalListing, CrawlStats, RawAd};
    pub use crate::storage::{ListingRepository, SharedListingRepository};
}

// Direct re-exports for convenience
pub use models::{CanonicalListing, CrawlStats, RawAd};

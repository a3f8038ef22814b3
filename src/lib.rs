//! cinescout - movie metadata aggregation
//!
//! Collects film metadata from wiki-style reference pages and retail
//! catalogs into a content-addressed SQLite store, then answers lookups
//! through external APIs (OMDb, TMDb, YouTube, Wikipedia) with the store
//! as a transparent fallback tier.
//!
//! # Architecture
//!
//! - [`scraper`]: crawl runner, per-site extraction strategies, polite
//!   rate limiting
//! - [`storage`]: deduplicating SQLite store and crawl audit log
//! - [`clients`]: unified two-tier lookups over live APIs and the store
//! - [`normalize`]: text cleanup shared by both sides
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cinescout::config::Config;
//! use cinescout::scraper::{CrawlRunner, DelayPolicy, PageFetcher};
//! use cinescout::storage::{SharedMovieStore, SqliteMovieStore};
//!
//! # async fn run() -> cinescout::Result<()> {
//! let config = Config::from_env()?;
//! let store: SharedMovieStore = Arc::new(SqliteMovieStore::new(&config.database.sqlite_path)?);
//! let fetcher = PageFetcher::new(&config.scraper)?;
//! let runner = CrawlRunner::new(store, fetcher, DelayPolicy::from_config(&config.scraper), 1)?;
//! let report = runner.run().await;
//! println!("{}: {} records", report.target_name, report.records_extracted);
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod scraper;
pub mod storage;

pub use error::{Error, ErrorCategory, Result};
pub use models::{
    CrawlLog, CrawlStatus, CrawlTarget, DataType, Provenance, RawRecord, RunReport, StoredRecord,
    UnifiedMovieResult,
};

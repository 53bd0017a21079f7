//! CEEPUR voter registry scraper library.
//!
//! Enumerates the voter identifier space, fetches one record per id from the
//! public CEEPUR lookup service, and appends records to a schema-checked CSV
//! file with support for resuming an interrupted scrape.
//!
//! # Architecture
//!
//! - [`fetch`] - record fetch boundary: HTTP lookup, XML decode, header
//!   rotation
//! - [`sink`] - resumable, buffered, schema-validated CSV persistence
//! - [`scrape`] - bounded-concurrency scheduler and run orchestration
//! - [`progress`] - progress bar reporting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod progress;
pub mod scrape;
pub mod sink;

// Re-export commonly used types
pub use fetch::{
    CEEPUR_VOTER_INFO_URL, FetchError, FetchOutcome, ID_COLUMN, VoterFetcher, VoterRecord, columns,
};
pub use progress::ScrapeProgress;
pub use scrape::{
    ConfigError, DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_CONCURRENT_TASKS, MAX_VOTER_ID, RunOutcome,
    RunReport, ScrapeConfig, ScrapeError, Scheduler, Scraper,
};
pub use sink::{CsvSink, SinkError};

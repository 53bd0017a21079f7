//! Error types for scrape runs.

use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;

use crate::fetch::FetchError;
use crate::sink::SinkError;

use super::MAX_VOTER_ID;

/// Configuration errors, fatal at startup before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `min_id` is below the valid identifier space.
    #[error("min id must be greater than 0, got {min}")]
    MinTooSmall {
        /// The rejected value.
        min: u32,
    },

    /// `max_id` is above the valid identifier space.
    #[error("max id must be at most {MAX_VOTER_ID}, got {max}")]
    MaxTooLarge {
        /// The rejected value.
        max: u32,
    },

    /// The requested range is empty.
    #[error("min id {min} must be less than or equal to max id {max}")]
    EmptyRange {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },

    /// Concurrency must admit at least one request.
    #[error("max concurrent tasks must be at least 1")]
    InvalidConcurrency,

    /// The output file already exists and resume mode is off.
    #[error("output file {} already exists (pass --continue-previous-scrape to resume)", path.display())]
    OutputExists {
        /// The clashing path.
        path: PathBuf,
    },

    /// An endpoint override did not parse as a URL.
    #[error("invalid endpoint URL {value:?}")]
    InvalidEndpoint {
        /// The rejected value.
        value: String,
    },
}

/// Everything that can abort a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Startup configuration failure.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sink construction or write failure.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// A single fetch failed; the first such failure aborts the run.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A fetch task panicked.
    #[error("fetch task failed: {0}")]
    Task(#[from] JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_mentions_bounds() {
        let msg = ConfigError::MaxTooLarge { max: 10_000_000 }.to_string();
        assert!(msg.contains("9999999"), "expected ceiling in: {msg}");
        assert!(msg.contains("10000000"), "expected value in: {msg}");
    }

    #[test]
    fn output_exists_display_suggests_resume_flag() {
        let msg = ConfigError::OutputExists {
            path: PathBuf::from("voter_records.csv"),
        }
        .to_string();
        assert!(msg.contains("voter_records.csv"));
        assert!(msg.contains("--continue-previous-scrape"));
    }

    #[test]
    fn scrape_error_wraps_sink_error() {
        let error: ScrapeError = SinkError::MissingColumn {
            column: "Status".to_string(),
        }
        .into();
        assert!(matches!(error, ScrapeError::Sink(_)));
        assert!(error.to_string().contains("Status"));
    }
}

//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use ceepur_scraper::{
    ConfigError, DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_CONCURRENT_TASKS, MAX_VOTER_ID, ScrapeConfig,
};

/// Scrape the public CEEPUR (Puerto Rico) voter registry into a CSV file.
///
/// One record is fetched per voter id over a bounded pool of concurrent
/// requests; an interrupted or aborted scrape can be resumed with
/// `--continue-previous-scrape`.
#[derive(Parser, Debug)]
#[command(name = "ceepur-scraper")]
#[command(author, version, about)]
pub struct Args {
    /// The filename to write the scraped voter records to
    #[arg(short, long, default_value = "voter_records.csv")]
    pub output: PathBuf,

    /// The maximum voter ID to scrape (cannot be greater than 9,999,999)
    #[arg(long, default_value_t = MAX_VOTER_ID)]
    pub max_id: u32,

    /// The minimum voter ID to scrape (cannot be less than 1)
    #[arg(long, default_value_t = 1)]
    pub min_id: u32,

    /// Scrape the identifier space in reverse (descending) order
    #[arg(long)]
    pub reverse: bool,

    /// The maximum number of concurrent requests
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONCURRENT_TASKS,
        value_parser = clap::value_parser!(usize).range(1..)
    )]
    pub max_concurrent_tasks: usize,

    /// Continue a previous scrape that was interrupted
    #[arg(short = 'c', long)]
    pub continue_previous_scrape: bool,

    /// Also save the status and category description columns
    /// (significantly increases the size of the output file)
    #[arg(long)]
    pub save_descriptions: bool,

    /// Surface the full underlying error when a scrape aborts
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the lookup endpoint (testing hook)
    #[arg(long, hide = true)]
    pub endpoint: Option<String>,
}

impl Args {
    /// Converts parsed arguments into a [`ScrapeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] if an endpoint override does
    /// not parse as a URL. Bound validation happens later, in
    /// [`ScrapeConfig::validate`].
    pub fn into_config(self) -> Result<ScrapeConfig, ConfigError> {
        let endpoint = match self.endpoint {
            Some(raw) => Some(
                Url::parse(&raw).map_err(|_| ConfigError::InvalidEndpoint { value: raw })?,
            ),
            None => None,
        };
        Ok(ScrapeConfig {
            output: self.output,
            min_id: self.min_id,
            max_id: self.max_id,
            reverse: self.reverse,
            max_concurrent_tasks: self.max_concurrent_tasks,
            save_descriptions: self.save_descriptions,
            resume: self.continue_previous_scrape,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            endpoint,
        })
    }
}

//! Scrape run orchestration.
//!
//! [`Scraper`] owns the run lifecycle: it validates configuration, opens the
//! sink (which checks the schema of any pre-existing output file), computes
//! the identifier set for this run, drives the [`scheduler`], and flushes the
//! sink on every termination path.

mod error;
pub mod scheduler;

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;

use tracing::{info, instrument, warn};
use url::Url;

use crate::fetch::{self, FetchOutcome, VoterFetcher};
use crate::progress::ScrapeProgress;
use crate::sink::CsvSink;

pub use error::{ConfigError, ScrapeError};
pub use scheduler::{RunOutcome, Scheduler};

/// Largest voter id in the identifier space.
pub const MAX_VOTER_ID: u32 = 9_999_999;

/// Rows buffered in the sink before an automatic flush.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1_000;

/// Default concurrent fetch cap.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 500;

/// Knobs for one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Output CSV path.
    pub output: PathBuf,
    /// Inclusive lower identifier bound.
    pub min_id: u32,
    /// Inclusive upper identifier bound.
    pub max_id: u32,
    /// Scan the identifier space descending.
    pub reverse: bool,
    /// Concurrent fetch cap (`K`).
    pub max_concurrent_tasks: usize,
    /// Persist the two human-readable description columns.
    pub save_descriptions: bool,
    /// Skip identifiers already present in the output file.
    pub resume: bool,
    /// Sink buffer size before an automatic flush.
    pub flush_threshold: usize,
    /// Lookup endpoint override (tests); `None` means the production URL.
    pub endpoint: Option<Url>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("voter_records.csv"),
            min_id: 1,
            max_id: MAX_VOTER_ID,
            reverse: false,
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            save_descriptions: false,
            resume: false,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            endpoint: None,
        }
    }
}

impl ScrapeConfig {
    /// Validates bounds, concurrency, and the output-path clash rule.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_id < 1 {
            return Err(ConfigError::MinTooSmall { min: self.min_id });
        }
        if self.max_id > MAX_VOTER_ID {
            return Err(ConfigError::MaxTooLarge { max: self.max_id });
        }
        if self.min_id > self.max_id {
            return Err(ConfigError::EmptyRange {
                min: self.min_id,
                max: self.max_id,
            });
        }
        if self.max_concurrent_tasks == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.output.exists() && !self.resume {
            return Err(ConfigError::OutputExists {
                path: self.output.clone(),
            });
        }
        Ok(())
    }
}

/// How a finished (non-error) run went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Completed or interrupted.
    pub outcome: RunOutcome,
    /// Identifiers this run set out to fetch (after resume subtraction).
    pub attempted: usize,
    /// Fetches that completed before the run ended.
    pub completed: u64,
    /// Records written to the sink (not-found outcomes persist nothing).
    pub persisted: u64,
}

/// One configured scrape run over the voter identifier space.
#[derive(Debug)]
pub struct Scraper {
    config: ScrapeConfig,
    sink: CsvSink,
}

impl Scraper {
    /// Validates `config` and opens the sink.
    ///
    /// # Errors
    ///
    /// Returns a configuration error (bad bounds, output clash) or a sink
    /// error (schema conflict with an existing output file). Nothing is
    /// written in either case.
    pub fn new(config: ScrapeConfig) -> Result<Self, ScrapeError> {
        config.validate()?;
        let columns = fetch::columns(config.save_descriptions);
        let sink = CsvSink::create(&config.output, columns, config.flush_threshold)?;
        Ok(Self { config, sink })
    }

    /// Identifiers this run will attempt.
    ///
    /// The full range (reversed when requested) minus, in resume mode, the
    /// identifiers already persisted. Known quirk, kept deliberately: the
    /// resume subtraction is a set difference, so the requested scan order
    /// is not preserved for the remainder of a resumed run.
    fn ids_to_scrape(&self) -> Result<Vec<u32>, ScrapeError> {
        let mut ids: Vec<u32> = (self.config.min_id..=self.config.max_id).collect();
        if self.config.reverse {
            ids.reverse();
        }
        if self.config.resume {
            let done = self.sink.existing_ids(fetch::ID_COLUMN)?;
            if !done.is_empty() {
                let requested: HashSet<u32> = ids.iter().copied().collect();
                ids = requested.difference(&done).copied().collect();
                info!(
                    already_persisted = done.len(),
                    remaining = ids.len(),
                    "resuming previous scrape"
                );
            }
        }
        Ok(ids)
    }

    /// Runs the scrape to completion, abort, or interruption.
    ///
    /// `interrupt` is the operator stop signal (Ctrl-C in the binary, any
    /// future in tests). The sink is flushed on every termination path, so
    /// buffered rows survive aborts and interruptions.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run. Rows buffered before the
    /// abort are flushed first.
    #[instrument(level = "debug", skip_all, fields(output = %self.config.output.display()))]
    pub async fn run(
        mut self,
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunReport, ScrapeError> {
        let ids = self.ids_to_scrape()?;
        let attempted = ids.len();
        info!(
            attempted,
            min_id = self.config.min_id,
            max_id = self.config.max_id,
            limit = self.config.max_concurrent_tasks,
            "scrape configured"
        );

        let fetcher = match &self.config.endpoint {
            Some(endpoint) => VoterFetcher::with_endpoint(endpoint.clone()),
            None => VoterFetcher::new(),
        };
        let progress = ScrapeProgress::new(attempted as u64);
        let scheduler = Scheduler::new(self.config.max_concurrent_tasks);

        let mut persisted: u64 = 0;
        let mut completed: u64 = 0;
        let sink = &mut self.sink;
        let result = scheduler
            .run(
                ids,
                |id| {
                    let fetcher = fetcher.clone();
                    async move { fetcher.fetch(id).await }
                },
                |outcome: FetchOutcome| -> Result<(), crate::sink::SinkError> {
                    if let FetchOutcome::Found(record) = outcome {
                        sink.write(&record.to_row())?;
                        persisted += 1;
                    }
                    Ok(())
                },
                |batch| {
                    completed += batch;
                    progress.inc(batch);
                },
                interrupt,
            )
            .await;

        // Buffered rows must reach disk no matter how the run ended.
        let flush_result = self.sink.flush();

        match result {
            Ok(outcome) => {
                flush_result?;
                match outcome {
                    RunOutcome::Completed => progress.finish(),
                    RunOutcome::Interrupted => progress.abandon(),
                }
                info!(attempted, completed, persisted, ?outcome, "run finished");
                Ok(RunReport {
                    outcome,
                    attempted,
                    completed,
                    persisted,
                })
            }
            Err(run_error) => {
                if let Err(flush_error) = flush_result {
                    warn!(error = %flush_error, "final flush failed after abort");
                }
                progress.abandon();
                Err(run_error)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> ScrapeConfig {
        ScrapeConfig {
            output: dir.path().join("out.csv"),
            min_id: 1,
            max_id: 5,
            ..ScrapeConfig::default()
        }
    }

    #[test]
    fn validate_rejects_zero_min_id() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            min_id: 0,
            ..config_in(&dir)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinTooSmall { min: 0 })
        ));
    }

    #[test]
    fn validate_rejects_oversized_max_id() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            max_id: MAX_VOTER_ID + 1,
            ..config_in(&dir)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaxTooLarge { .. })
        ));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            min_id: 10,
            max_id: 5,
            ..config_in(&dir)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyRange { min: 10, max: 5 })
        ));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            max_concurrent_tasks: 0,
            ..config_in(&dir)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn validate_rejects_existing_output_without_resume() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::write(&config.output, "anything").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutputExists { .. })
        ));
    }

    #[test]
    fn validate_allows_existing_output_with_resume() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            resume: true,
            ..config_in(&dir)
        };
        std::fs::write(
            &config.output,
            "NumeroElectoral,Category,FechaNacimiento,Precinto,Status,Unidad\n",
        )
        .unwrap();
        config.validate().unwrap();
        // And the scraper itself opens over the matching header.
        Scraper::new(config).unwrap();
    }

    #[test]
    fn scraper_rejects_schema_conflict_on_resume() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            resume: true,
            ..config_in(&dir)
        };
        std::fs::write(&config.output, "Completely,Different,Header\n").unwrap();
        let result = Scraper::new(config);
        assert!(matches!(
            result,
            Err(ScrapeError::Sink(crate::sink::SinkError::SchemaMismatch { .. }))
        ));
    }

    #[test]
    fn ids_cover_range_ascending_and_descending() {
        let dir = TempDir::new().unwrap();
        let scraper = Scraper::new(config_in(&dir)).unwrap();
        assert_eq!(scraper.ids_to_scrape().unwrap(), vec![1, 2, 3, 4, 5]);

        let dir = TempDir::new().unwrap();
        let scraper = Scraper::new(ScrapeConfig {
            reverse: true,
            ..config_in(&dir)
        })
        .unwrap();
        assert_eq!(scraper.ids_to_scrape().unwrap(), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn resume_subtracts_persisted_ids_as_a_set() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            resume: true,
            ..config_in(&dir)
        };
        std::fs::write(
            &config.output,
            "NumeroElectoral,Category,FechaNacimiento,Precinto,Status,Unidad\n\
             1,III,1/1/1970,77,A,12\n\
             2,III,1/1/1970,77,A,12\n\
             3,III,1/1/1970,77,A,12\n",
        )
        .unwrap();

        let scraper = Scraper::new(config).unwrap();
        let ids = scraper.ids_to_scrape().unwrap();

        // Set semantics only: the requested order (including --reverse) is
        // not guaranteed to survive the resume subtraction.
        let as_set: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(as_set, HashSet::from([4, 5]));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn run_with_empty_resumed_set_completes_without_fetching() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            min_id: 1,
            max_id: 3,
            resume: true,
            ..config_in(&dir)
        };
        std::fs::write(
            &config.output,
            "NumeroElectoral,Category,FechaNacimiento,Precinto,Status,Unidad\n\
             1,III,1/1/1970,77,A,12\n\
             2,III,1/1/1970,77,A,12\n\
             3,III,1/1/1970,77,A,12\n",
        )
        .unwrap();

        // Endpoint is never contacted: the resumed set is empty.
        let scraper = Scraper::new(config).unwrap();
        let report = tokio_test::block_on(scraper.run(std::future::pending())).unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.persisted, 0);
    }
}

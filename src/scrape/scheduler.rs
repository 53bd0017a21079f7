//! Bounded-concurrency fetch scheduler.
//!
//! [`Scheduler::run`] keeps up to `limit` fetches in flight over an ordered
//! identifier stream, hands each completed outcome to the caller, aborts the
//! whole run on the first failure, and cancels outstanding work when the
//! caller's interrupt future resolves.
//!
//! # Concurrency model
//!
//! - Pending identifiers live in a queue; in-flight fetches live in a
//!   [`JoinSet`] that never holds more than `limit` tasks.
//! - Completions are handled first-completed-first-handled; there is no
//!   ordering guarantee between concurrently started fetches.
//! - All callback invocations happen on the control loop, so the caller's
//!   sink buffer needs no synchronization.
//! - Cancellation (`abort_all`) is best-effort: a task past its last await
//!   may still have completed its request.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::fetch::{FetchError, FetchOutcome};
use crate::sink::SinkError;

use super::error::ScrapeError;

/// Default bounded wait before the loop wakes to report progress.
///
/// A liveness mechanism, not a failure timeout: fetches that have not
/// completed within a tick simply stay in flight.
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every identifier was attempted and every fetch succeeded.
    Completed,
    /// The operator interrupted the run; outstanding fetches were cancelled.
    Interrupted,
}

/// Capped-window scheduler over an ordered identifier stream.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    limit: usize,
    tick: Duration,
}

impl Scheduler {
    /// Creates a scheduler admitting at most `limit` concurrent fetches.
    ///
    /// A limit of zero is clamped to one; zero would never admit work.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            tick: DEFAULT_TICK,
        }
    }

    /// Overrides the progress tick (tests use a short one).
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drives fetches for `ids` to completion.
    ///
    /// * `fetch` starts one lookup; each identifier is passed to it at most
    ///   once per run.
    /// * `on_record` receives every successful outcome, including successes
    ///   that completed in the same batch as a failed fetch; an error from it
    ///   aborts the run like a fetch failure.
    /// * `on_progress` receives the number of fetches that completed since
    ///   the previous report (possibly zero on a quiet tick).
    /// * `interrupt` resolving cancels all outstanding fetches and ends the
    ///   run with [`RunOutcome::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns the first fetch, sink, or task error observed; outstanding
    /// fetches are cancelled before it is surfaced. Later errors in the same
    /// completion batch are discarded.
    #[instrument(level = "debug", skip_all, fields(ids = ids.len(), limit = self.limit))]
    pub async fn run<F, Fut>(
        &self,
        ids: Vec<u32>,
        fetch: F,
        mut on_record: impl FnMut(FetchOutcome) -> Result<(), SinkError>,
        mut on_progress: impl FnMut(u64),
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunOutcome, ScrapeError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<FetchOutcome, FetchError>> + Send + 'static,
    {
        let mut pending: VecDeque<u32> = ids.into();
        let mut in_flight: JoinSet<Result<FetchOutcome, FetchError>> = JoinSet::new();
        tokio::pin!(interrupt);

        info!(pending = pending.len(), "starting scrape run");

        while !pending.is_empty() || !in_flight.is_empty() {
            while in_flight.len() < self.limit {
                let Some(id) = pending.pop_front() else { break };
                in_flight.spawn(fetch(id));
            }

            let batch = tokio::select! {
                () = &mut interrupt => {
                    warn!(
                        in_flight = in_flight.len(),
                        pending = pending.len(),
                        "interrupt received, cancelling outstanding fetches"
                    );
                    in_flight.abort_all();
                    return Ok(RunOutcome::Interrupted);
                }
                batch = next_batch(&mut in_flight, self.tick) => batch,
            };

            let mut completed: u64 = 0;
            let mut first_error: Option<ScrapeError> = None;
            let mut record_failed = false;
            for result in batch {
                match result {
                    // Successes are recorded even when an earlier fetch in the
                    // batch failed; their rows are already paid for and must
                    // not be refetched on resume. Only a sink failure stops
                    // further recording.
                    Ok(Ok(outcome)) => {
                        completed += 1;
                        if !record_failed {
                            if let Err(error) = on_record(outcome) {
                                record_failed = true;
                                if first_error.is_none() {
                                    first_error = Some(error.into());
                                }
                            }
                        }
                    }
                    Ok(Err(fetch_error)) => {
                        completed += 1;
                        if first_error.is_none() {
                            first_error = Some(fetch_error.into());
                        } else {
                            debug!(error = %fetch_error, "discarding later error in batch");
                        }
                    }
                    Err(join_error) if join_error.is_cancelled() => {}
                    Err(join_error) => {
                        if first_error.is_none() {
                            first_error = Some(ScrapeError::Task(join_error));
                        } else {
                            debug!(error = %join_error, "discarding later task error in batch");
                        }
                    }
                }
            }
            on_progress(completed);

            if let Some(error) = first_error {
                warn!(error = %error, "aborting run on first failure");
                in_flight.abort_all();
                return Err(error);
            }
        }

        info!("scrape run completed");
        Ok(RunOutcome::Completed)
    }
}

/// Waits up to `tick` for at least one completion, then drains everything
/// already finished. An empty batch means a quiet tick.
async fn next_batch(
    in_flight: &mut JoinSet<Result<FetchOutcome, FetchError>>,
    tick: Duration,
) -> Vec<Result<Result<FetchOutcome, FetchError>, JoinError>> {
    let mut batch = Vec::new();
    match tokio::time::timeout(tick, in_flight.join_next()).await {
        Ok(Some(first)) => {
            batch.push(first);
            while let Some(next) = in_flight.try_join_next() {
                batch.push(next);
            }
        }
        Ok(None) | Err(_) => {}
    }
    batch
}

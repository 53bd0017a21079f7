//! Progress bar for scrape runs.

use indicatif::{ProgressBar, ProgressStyle};

/// Thin wrapper over an [`indicatif`] bar sized to the identifiers this run
/// will attempt. Purely observational; the scheduler reports batch counts
/// into it.
#[derive(Debug)]
pub struct ScrapeProgress {
    bar: ProgressBar,
}

impl ScrapeProgress {
    /// Creates a bar for `total` identifiers.
    #[must_use]
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {per_sec}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Creates a hidden bar (tests, quiet runs).
    #[must_use]
    pub fn hidden(total: u64) -> Self {
        Self {
            bar: ProgressBar::hidden().with_style(ProgressStyle::default_bar()),
        }
        .with_length(total)
    }

    fn with_length(self, total: u64) -> Self {
        self.bar.set_length(total);
        self
    }

    /// Records `completed` newly finished fetches.
    pub fn inc(&self, completed: u64) {
        self.bar.inc(completed);
    }

    /// Finishes the bar after a clean run.
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Leaves the bar at its current position after an abort or interrupt.
    pub fn abandon(&self) {
        self.bar.abandon();
    }

    /// Current position (completed fetches reported so far).
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_accumulates_batches() {
        let progress = ScrapeProgress::hidden(10);
        progress.inc(3);
        progress.inc(0);
        progress.inc(4);
        assert_eq!(progress.position(), 7);
        progress.finish();
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use crate::copier::{CopyOutcome, CopyStatus};

/// Prints per-key outcomes and keeps running totals.
///
/// Clones share the same counters and spinner, so every worker can hold
/// its own handle.
#[derive(Clone)]
pub struct Reporter {
    copied: Arc<AtomicUsize>,
    skipped: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    quiet: bool,
    echo: bool,
    spinner: ProgressBar,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        let spinner = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        };

        Self {
            copied: Arc::new(AtomicUsize::new(0)),
            skipped: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            quiet,
            echo: true,
            spinner,
        }
    }

    /// Reporter that never prints
    #[cfg(test)]
    pub fn silent() -> Self {
        let mut reporter = Self::new(true);
        reporter.echo = false;
        reporter
    }

    pub fn record(&self, outcome: &CopyOutcome) {
        let counter = match &outcome.result {
            Ok(CopyStatus::Copied { .. }) => &self.copied,
            Ok(CopyStatus::Skipped) => &self.skipped,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let is_failure = outcome.result.is_err();
        if self.echo && (!self.quiet || is_failure) {
            let line = format_outcome(outcome);
            self.spinner.suspend(|| println!("{}", line));
        }

        self.spinner.set_message(format!(
            "{} copied, {} skipped, {} failed",
            self.copied.load(Ordering::SeqCst),
            self.skipped.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst)
        ));
    }

    /// Report a problem that is not tied to a single key.
    pub fn warn(&self, message: &str) {
        if self.echo {
            self.spinner.suspend(|| println!("{}", message));
        }
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }

    pub fn copied(&self) -> usize {
        self.copied.load(Ordering::SeqCst)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

pub fn format_outcome(outcome: &CopyOutcome) -> String {
    match &outcome.result {
        Ok(CopyStatus::Copied { elapsed, .. }) => format!(
            "[{}] Successfully copied object from old profile to new profile in: {} ms.",
            outcome.key,
            elapsed.as_millis()
        ),
        Ok(CopyStatus::Skipped) => format!(
            "[{}] already exists in the destination bucket. Skipping copy.",
            outcome.key
        ),
        Err(e) => format!("Error processing line: {}", e),
    }
}

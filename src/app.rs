use anyhow::{Context, Result};
use async_channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::args::Args;
use crate::config::{Config, Profile};
use crate::copier::{Copier, CopyOutcome, CopyStatus};
use crate::error::CopyError;
use crate::keys::KeySource;
use crate::progress::Reporter;
use crate::storage::StoreConnector;

/// Immutable settings for one migration run, built once at startup
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub bucket: String,
    pub key_file: PathBuf,
    pub check_existence: bool,
    pub workers: usize,
    pub source: Profile,
    pub destination: Profile,
}

impl MigrationSettings {
    pub fn new(args: &Args, config: &Config) -> Self {
        Self {
            bucket: args.bucket.clone(),
            key_file: args.filename.clone(),
            check_existence: args.check,
            workers: args.workers,
            source: config.source().clone(),
            destination: config.destination().clone(),
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    pub submitted: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub blank_lines: usize,
    pub read_error: Option<String>,
}

struct FeedResult {
    submitted: usize,
    blank_lines: usize,
    read_error: Option<String>,
}

/// Streams keys from the key file into a fixed pool of copy workers
pub struct MigrationApp {
    settings: Arc<MigrationSettings>,
    connector: Arc<dyn StoreConnector>,
    reporter: Reporter,
}

impl MigrationApp {
    pub fn new(
        settings: MigrationSettings,
        connector: Arc<dyn StoreConnector>,
        reporter: Reporter,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            connector,
            reporter,
        }
    }

    /// Copy every key in the key file and wait for all workers to finish.
    ///
    /// Only an unreadable key file is an error here; per-key failures are
    /// reported and counted in the summary.
    pub async fn run(&self) -> Result<MigrationSummary> {
        let keys = KeySource::open(&self.settings.key_file).await?;

        let workers = self.settings.workers.max(1);
        // Feeder blocks once `workers` keys are waiting
        let (tx, rx) = async_channel::bounded::<String>(workers);

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let rx = rx.clone();
            let copier = Copier::new(self.connector.clone(), self.settings.clone());
            let reporter = self.reporter.clone();

            pool.spawn(async move {
                while let Ok(key) = rx.recv().await {
                    tracing::trace!(worker, key = %key, "Processing key");
                    // A panicking copy fails its own key, not the worker
                    let task = {
                        let copier = copier.clone();
                        let key = key.clone();
                        tokio::spawn(async move { copier.copy(key).await })
                    };
                    let outcome = match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(worker, key = %key, "Copy task failed: {}", e);
                            CopyOutcome {
                                key: key.clone(),
                                result: Err(CopyError::Aborted {
                                    key,
                                    reason: e.to_string(),
                                }),
                            }
                        }
                    };
                    match &outcome.result {
                        Ok(CopyStatus::Copied {
                            bytes,
                            content_type,
                            ..
                        }) => tracing::debug!(
                            worker,
                            key = %outcome.key,
                            bytes,
                            content_type = content_type.as_deref().unwrap_or("-"),
                            "Copied"
                        ),
                        Ok(CopyStatus::Skipped) => {
                            tracing::debug!(worker, key = %outcome.key, "Skipped")
                        }
                        Err(e) => tracing::debug!(worker, key = e.key(), error = %e, "Copy failed"),
                    }
                    reporter.record(&outcome);
                }
                tracing::trace!(worker, "Worker exiting");
            });
        }
        drop(rx);

        tracing::info!(
            workers,
            bucket = %self.settings.bucket,
            check = self.settings.check_existence,
            "Running"
        );

        let feeder = tokio::spawn(feed(keys, tx, self.reporter.clone()));
        let fed = feeder.await.context("Key feeder task failed")?;

        tracing::info!(submitted = fed.submitted, "Key file exhausted, draining");

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        self.reporter.finish();

        let summary = MigrationSummary {
            submitted: fed.submitted,
            copied: self.reporter.copied(),
            skipped: self.reporter.skipped(),
            failed: self.reporter.failed(),
            blank_lines: fed.blank_lines,
            read_error: fed.read_error,
        };
        tracing::info!(
            submitted = summary.submitted,
            copied = summary.copied,
            skipped = summary.skipped,
            failed = summary.failed,
            blank_lines = summary.blank_lines,
            "Done"
        );

        Ok(summary)
    }
}

/// Push keys in file order until EOF or a read error; dropping `tx` closes the channel.
async fn feed(mut keys: KeySource, tx: Sender<String>, reporter: Reporter) -> FeedResult {
    let mut submitted = 0;

    let read_error = loop {
        match keys.next_key().await {
            Ok(Some(key)) => {
                if let Err(e) = tx.send(key).await {
                    let message = format!("No workers left to process [{}]", e.0);
                    tracing::error!("{}", message);
                    reporter.warn(&message);
                    break Some(message);
                }
                submitted += 1;
            }
            Ok(None) => break None,
            Err(e) => {
                let message = format!(
                    "Error reading file at line {}: {}",
                    keys.line_number() + 1,
                    e
                );
                tracing::error!("{}", message);
                reporter.warn(&message);
                break Some(message);
            }
        }
    };

    FeedResult {
        submitted,
        blank_lines: keys.blank_lines(),
        read_error,
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod args;
mod config;
mod copier;
mod error;
mod keys;
mod progress;
mod s3_utils;
mod storage;
#[cfg(test)]
mod testing;

use app::{MigrationApp, MigrationSettings};
use args::Args;
use config::Config;
use progress::Reporter;
use s3_utils::S3Connector;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments; missing required flags print usage and exit
    let args = Args::parse();

    init_logging(args.verbose);

    let config = Config::load(&args.config).context("Error loading configuration")?;
    let settings = MigrationSettings::new(&args, &config);

    let connector = Arc::new(S3Connector::new(settings.workers));
    let reporter = Reporter::new(args.quiet);
    let app = MigrationApp::new(settings, connector, reporter);

    let summary = app.run().await?;

    println!("Processing complete!");

    if args.strict {
        if let Some(read_error) = summary.read_error {
            anyhow::bail!("Key file was not read completely: {}", read_error);
        }
        if summary.failed > 0 {
            anyhow::bail!(
                "{} of {} objects failed to migrate",
                summary.failed,
                summary.submitted
            );
        }
    }
    Ok(())
}

/// Diagnostics go to stderr; stdout carries the per-key report.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "s3_migrate=info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

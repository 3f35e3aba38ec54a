use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_WORKERS: usize = 100;
pub const MAX_WORKERS: usize = 1000;

/// CLI arguments for the S3 object migration tool
#[derive(Parser, Debug)]
#[command(name = "s3_migrate")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file holding both profiles
    #[arg(long)]
    pub config: PathBuf,

    /// Path to the file containing keys to migrate, one per line
    #[arg(long)]
    pub filename: PathBuf,

    /// Name of the bucket to operate on (same name on both sides)
    #[arg(long)]
    pub bucket: String,

    /// Check if the object exists in the destination bucket before copying
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Number of concurrent copy workers (default: 100, max: 1000)
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = parse_workers)]
    pub workers: usize,

    /// Exit with a non-zero status when any object failed to copy
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Only print failures and the final completion line
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Log progress details to stderr (overridden by RUST_LOG)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_workers(value: &str) -> Result<usize, String> {
    let workers: usize = value
        .parse()
        .map_err(|_| format!("`{}` is not a valid worker count", value))?;
    if workers == 0 || workers > MAX_WORKERS {
        return Err(format!("Workers must be between 1 and {}", MAX_WORKERS));
    }
    Ok(workers)
}

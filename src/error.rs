use std::fmt;
use thiserror::Error;

use crate::storage::StorageError;

/// Which account a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("old profile"),
            Side::Destination => f.write_str("new profile"),
        }
    }
}

/// Failure of a single key. Never fatal to the rest of the migration.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("[{key}] failed to connect to {side}: {source}")]
    Connection {
        key: String,
        side: Side,
        source: StorageError,
    },

    #[error("[{key}] failed to get object from old profile: {source}")]
    Fetch { key: String, source: StorageError },

    #[error("[{key}] failed to put object to new profile: {source}")]
    Upload { key: String, source: StorageError },

    #[error("[{key}] ETags don't match after copy: {source_e_tag} != {destination_e_tag}")]
    Integrity {
        key: String,
        source_e_tag: String,
        destination_e_tag: String,
    },

    #[error("[{key}] copy aborted: {reason}")]
    Aborted { key: String, reason: String },
}

impl CopyError {
    pub fn key(&self) -> &str {
        match self {
            CopyError::Connection { key, .. }
            | CopyError::Fetch { key, .. }
            | CopyError::Upload { key, .. }
            | CopyError::Integrity { key, .. }
            | CopyError::Aborted { key, .. } => key,
        }
    }
}

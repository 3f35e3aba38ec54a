//! Connection profiles for the two storage accounts.
//!
//! The configuration file is YAML:
//!
//! ```yaml
//! profiles:
//!   oldProfile:
//!     region: us-east-1
//!     endpoint: https://s3.old-provider.example
//!     accessKey: AKIA...
//!     secretKey: ...
//!   newProfile:
//!     region: eu-west-1
//!     endpoint: https://s3.new-provider.example
//!     accessKey: AKIA...
//!     secretKey: ...
//! ```
//!
//! Missing string fields load as empty values; they surface later as
//! connection or request failures for each key rather than here.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Connection parameters for one storage account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    /// Use path-style addressing against a custom endpoint
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
}

fn default_force_path_style() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profiles {
    /// Source account
    pub old_profile: Profile,

    /// Destination account
    pub new_profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub profiles: Profiles,
}

impl Config {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            "Loaded config from {:?}: source region={:?}, destination region={:?}",
            path,
            config.profiles.old_profile.region,
            config.profiles.new_profile.region
        );

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    pub fn source(&self) -> &Profile {
        &self.profiles.old_profile
    }

    pub fn destination(&self) -> &Profile {
        &self.profiles.new_profile
    }
}

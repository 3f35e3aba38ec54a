use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Profile;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("invalid connection settings: {0}")]
    InvalidProfile(String),

    #[error("{0}")]
    Request(String),
}

/// A fully buffered object read from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub e_tag: Option<String>,
}

/// Operations needed from one storage account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(true)` if the object exists, `Ok(false)` if it does not.
    async fn head(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError>;

    /// Store `body` under `key` and return the storage-assigned ETag.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> Result<Option<String>, StorageError>;
}

/// Opens an [`ObjectStore`] handle for a profile
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, profile: &Profile) -> Result<Arc<dyn ObjectStore>, StorageError>;
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app::MigrationSettings;
use crate::error::{CopyError, Side};
use crate::storage::{ObjectStore, StoreConnector};

/// How a key was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyStatus {
    /// Body transferred and ETags verified
    Copied {
        elapsed: Duration,
        bytes: usize,
        content_type: Option<String>,
    },
    /// Destination already had the object
    Skipped,
}

/// Result of processing one key
#[derive(Debug)]
pub struct CopyOutcome {
    pub key: String,
    pub result: Result<CopyStatus, CopyError>,
}

/// Copies single keys from the source account to the destination account
#[derive(Clone)]
pub struct Copier {
    connector: Arc<dyn StoreConnector>,
    settings: Arc<MigrationSettings>,
}

impl Copier {
    pub fn new(connector: Arc<dyn StoreConnector>, settings: Arc<MigrationSettings>) -> Self {
        Self {
            connector,
            settings,
        }
    }

    pub async fn copy(&self, key: String) -> CopyOutcome {
        let result = self.copy_object(&key).await;
        CopyOutcome { key, result }
    }

    async fn copy_object(&self, key: &str) -> Result<CopyStatus, CopyError> {
        let bucket = self.settings.bucket.as_str();

        let source = self.connect(key, Side::Source).await?;
        let destination = self.connect(key, Side::Destination).await?;

        if self.settings.check_existence {
            match destination.head(bucket, key).await {
                Ok(true) => return Ok(CopyStatus::Skipped),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(key, error = %e, "Existence check failed, copying anyway");
                }
            }
        }

        let started = Instant::now();

        let object = source
            .get(bucket, key)
            .await
            .map_err(|source| CopyError::Fetch {
                key: key.to_string(),
                source,
            })?;

        let content_type = resolve_content_type(key, object.content_type.as_deref());
        let bytes = object.body.len();

        let destination_e_tag = destination
            .put(bucket, key, object.body, content_type.clone())
            .await
            .map_err(|source| CopyError::Upload {
                key: key.to_string(),
                source,
            })?;

        verify_e_tags(key, object.e_tag.as_deref(), destination_e_tag.as_deref())?;

        Ok(CopyStatus::Copied {
            elapsed: started.elapsed(),
            bytes,
            content_type,
        })
    }

    async fn connect(&self, key: &str, side: Side) -> Result<Arc<dyn ObjectStore>, CopyError> {
        let profile = match side {
            Side::Source => &self.settings.source,
            Side::Destination => &self.settings.destination,
        };
        self.connector
            .connect(profile)
            .await
            .map_err(|source| CopyError::Connection {
                key: key.to_string(),
                side,
                source,
            })
    }
}

/// Content type for the destination object.
///
/// `.jpg`/`.jpeg` and `.png` keys (case-sensitive) are forced to the
/// matching image type; anything else keeps the source content type.
pub fn resolve_content_type(key: &str, source_content_type: Option<&str>) -> Option<String> {
    if key.ends_with(".jpg") || key.ends_with(".jpeg") {
        Some("image/jpeg".to_string())
    } else if key.ends_with(".png") {
        Some("image/png".to_string())
    } else {
        source_content_type.map(str::to_string)
    }
}

fn verify_e_tags(
    key: &str,
    source_e_tag: Option<&str>,
    destination_e_tag: Option<&str>,
) -> Result<(), CopyError> {
    match (source_e_tag, destination_e_tag) {
        (Some(src), Some(dst)) if src.trim_matches('"') == dst.trim_matches('"') => Ok(()),
        (src, dst) => Err(CopyError::Integrity {
            key: key.to_string(),
            source_e_tag: src.unwrap_or("<none>").to_string(),
            destination_e_tag: dst.unwrap_or("<none>").to_string(),
        }),
    }
}

//! In-memory storage backend and fixtures shared by unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::app::MigrationSettings;
use crate::config::Profile;
use crate::storage::{ObjectStore, StorageError, StoreConnector, StoredObject};

pub const BUCKET: &str = "media";
pub const SOURCE_ENDPOINT: &str = "http://source.test";
pub const DESTINATION_ENDPOINT: &str = "http://destination.test";

pub fn profile(endpoint: &str) -> Profile {
    Profile {
        region: "us-east-1".to_string(),
        endpoint: endpoint.to_string(),
        access_key: "AK".to_string(),
        secret_key: "SK".to_string(),
        force_path_style: true,
    }
}

pub fn settings(check_existence: bool, workers: usize) -> MigrationSettings {
    MigrationSettings {
        bucket: BUCKET.to_string(),
        key_file: PathBuf::new(),
        check_existence,
        workers,
        source: profile(SOURCE_ENDPOINT),
        destination: profile(DESTINATION_ENDPOINT),
    }
}

pub fn key_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn e_tag_of(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

/// One bucket-agnostic account held in memory, counting every call.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    gets: Mutex<HashMap<String, usize>>,
    puts: Mutex<HashMap<String, usize>>,
    heads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    corrupt: HashSet<String>,
    poisoned: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every GET takes at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// PUTs of `key` answer with an ETag that does not match the body.
    pub fn corrupting(mut self, key: &str) -> Self {
        self.corrupt.insert(key.to_string());
        self
    }

    /// GETs of `key` panic.
    pub fn panicking(mut self, key: &str) -> Self {
        self.poisoned.insert(key.to_string());
        self
    }

    pub fn insert(&self, key: &str, body: &'static [u8], content_type: Option<&str>) {
        let object = StoredObject {
            body: Bytes::from_static(body),
            content_type: content_type.map(str::to_string),
            e_tag: Some(e_tag_of(body)),
        };
        self.objects.lock().unwrap().insert(key.to_string(), object);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn get_calls(&self, key: &str) -> usize {
        self.gets.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn put_calls(&self, key: &str) -> usize {
        self.puts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_gets(&self) -> usize {
        self.gets.lock().unwrap().values().sum()
    }

    pub fn total_puts(&self) -> usize {
        self.puts.lock().unwrap().values().sum()
    }

    pub fn total_heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head(&self, _bucket: &str, key: &str) -> Result<bool, StorageError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        *self.gets.lock().unwrap().entry(key.to_string()).or_default() += 1;
        if self.poisoned.contains(key) {
            panic!("storage backend blew up on {key}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.object(key).ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put(
        &self,
        _bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> Result<Option<String>, StorageError> {
        *self.puts.lock().unwrap().entry(key.to_string()).or_default() += 1;

        let e_tag = if self.corrupt.contains(key) {
            "\"corrupted\"".to_string()
        } else {
            e_tag_of(&body)
        };
        let object = StoredObject {
            body,
            content_type,
            e_tag: Some(e_tag.clone()),
        };
        self.objects.lock().unwrap().insert(key.to_string(), object);
        Ok(Some(e_tag))
    }
}

/// Resolves profiles to in-memory stores by endpoint.
pub struct MemoryConnector {
    pub source: Arc<MemoryStore>,
    pub destination: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new(source: MemoryStore, destination: MemoryStore) -> Self {
        Self {
            source: Arc::new(source),
            destination: Arc::new(destination),
        }
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, profile: &Profile) -> Result<Arc<dyn ObjectStore>, StorageError> {
        match profile.endpoint.as_str() {
            SOURCE_ENDPOINT => Ok(self.source.clone()),
            DESTINATION_ENDPOINT => Ok(self.destination.clone()),
            other => Err(StorageError::InvalidProfile(format!(
                "unknown endpoint '{}'",
                other
            ))),
        }
    }
}

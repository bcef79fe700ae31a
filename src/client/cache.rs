//! Client-side persistence of the last successful departures payload.
//!
//! Entries are versioned and age-limited. A stale, foreign-version or
//! unreadable entry reads as a miss, never as an error.

use chrono::{DateTime, Duration, Utc};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{DeparturesEnvelope, to_iso};
use crate::routes::{DirectionKey, RouteKey};
use crate::services::time::parse_instant;

pub const CACHE_VERSION: u32 = 1;
pub const MAX_CACHE_AGE_HOURS: i64 = 12;
const KEY_NAMESPACE: &str = "ferjetider";

/// Versioned, namespaced key for one route + direction
pub fn build_cache_key(route: RouteKey, direction: DirectionKey) -> String {
    format!("{}:{}:{}:v{}", KEY_NAMESPACE, route, direction, CACHE_VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    pub version: u32,
    pub saved_at_iso: String,
    pub payload: DeparturesEnvelope,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key/value storage behind the cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

/// Process-local store, lost on exit
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }
}

/// Departure payloads stored with a version tag and a save time
#[derive(Clone)]
pub struct DepartureCache {
    store: Arc<dyn CacheStore>,
    max_age: Duration,
}

impl DepartureCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            max_age: Duration::hours(MAX_CACHE_AGE_HOURS),
        }
    }

    pub async fn save(
        &self,
        key: &str,
        payload: &DeparturesEnvelope,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            saved_at_iso: to_iso(now),
            payload: payload.clone(),
        };
        let value = serde_json::to_string(&envelope)?;
        self.store.set(key, value).await
    }

    /// The stored payload, or `None` if missing, expired, foreign or corrupt
    pub async fn load(&self, key: &str, now: DateTime<Utc>) -> Option<DeparturesEnvelope> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let envelope: CacheEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(key = %key, error = %e, "Discarding unreadable cache entry");
                return None;
            }
        };

        if envelope.version != CACHE_VERSION {
            debug!(key = %key, version = envelope.version, "Discarding cache entry from another version");
            return None;
        }

        let saved_at = parse_instant(&envelope.saved_at_iso)?;
        if now.signed_duration_since(saved_at) > self.max_age {
            debug!(key = %key, saved_at = %envelope.saved_at_iso, "Discarding expired cache entry");
            return None;
        }

        Some(envelope.payload)
    }
}

//! Cache handle shared by the fetcher, creator, and repository iterator.

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheError, CacheStore};

/// Snapshot of every cached blob plus the store that persists changes.
///
/// The snapshot is read once when the handle is opened. Every `put` writes the
/// full value through to the store before updating the snapshot, so a key
/// always holds the latest observed state.
pub struct Cache {
    blobs: DashMap<String, String>,
    store: Box<dyn CacheStore>,
}

impl Cache {
    /// Load all blobs from `store`.
    pub fn open(store: impl CacheStore + 'static) -> Self {
        let blobs: DashMap<String, String> = store.load_all().into_iter().collect();
        log::debug!("Loaded {} cache entries", blobs.len());
        Self {
            blobs,
            store: Box::new(store),
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    /// Parse the blob cached under `key`, or `None` on a cache miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(blob) = self.blobs.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(blob.value())
            .map(Some)
            .map_err(|source| CacheError::Json {
                key: key.to_string(),
                source,
            })
    }

    /// Serialize `value` and persist it under `key`, replacing any prior blob.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let blob = serde_json::to_string(value).map_err(|source| CacheError::Json {
            key: key.to_string(),
            source,
        })?;
        self.store.write(key, &blob)?;
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

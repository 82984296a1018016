//! Persistent key/blob storage backing the observed-state cache.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::lock::LOCK_FILE;

/// Errors returned by cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An underlying IO operation failed.
    #[error("cache io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A cached blob could not be parsed, or a value could not be serialized.
    #[error("cache entry {key} is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// Another process holds the cache root.
    #[error("cache root {0} is locked by another process")]
    Locked(PathBuf),
}

fn io_err(path: impl Into<PathBuf>, source: io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}

/// Flat mapping from cache key to serialized blob.
pub trait CacheStore: Send + Sync {
    /// Read every stored blob, keyed by its cache key.
    ///
    /// A missing or unreadable store yields an empty mapping.
    fn load_all(&self) -> HashMap<String, String>;

    /// Replace the blob stored under `key`, creating its namespace if needed.
    fn write(&self, key: &str, blob: &str) -> Result<(), CacheError>;
}

/// Cache store rooted at a directory; keys are `/`-separated relative paths.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl CacheStore for FsStore {
    fn load_all(&self) -> HashMap<String, String> {
        let mut blobs = HashMap::new();
        if let Err(e) = collect_blobs(&self.root, &self.root, &mut blobs) {
            log::debug!(
                "Cache root {} not readable ({}), starting cold",
                self.root.display(),
                e
            );
            return HashMap::new();
        }
        blobs
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), CacheError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        // Write beside the target and rename over it so a reader never sees a
        // half-written blob.
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);
        std::fs::write(&temp_path, blob).map_err(|e| io_err(&temp_path, e))?;
        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(io_err(&path, e));
        }
        Ok(())
    }
}

fn collect_blobs(
    root: &Path,
    dir: &Path,
    blobs: &mut HashMap<String, String>,
) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("Skipping cache entry {}: {}", path.display(), e);
                continue;
            }
        };
        if meta.is_dir() {
            if let Err(e) = collect_blobs(root, &path, blobs) {
                log::warn!("Skipping cache namespace {}: {}", path.display(), e);
            }
            continue;
        }

        let Some(key) = relative_key(root, &path) else {
            continue;
        };
        if key == LOCK_FILE || is_temp_blob(&key) {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(blob) => {
                blobs.insert(key, blob);
            }
            Err(e) => log::warn!("Skipping unreadable cache file {}: {}", path.display(), e),
        }
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
    Some(segments?.join("/"))
}

fn is_temp_blob(key: &str) -> bool {
    key.ends_with(".tmp")
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: std::sync::Mutex<HashMap<String, String>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_blobs<I, K, V>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::default();
        store.blobs.lock().unwrap().extend(
            blobs
                .into_iter()
                .map(|(key, blob)| (key.into(), blob.into())),
        );
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    pub fn fail_writes(&self) {
        self.fail_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl CacheStore for MemoryStore {
    fn load_all(&self) -> HashMap<String, String> {
        self.blobs.lock().unwrap().clone()
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(io_err(key, io::Error::other("disk full")));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

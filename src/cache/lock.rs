use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

use super::CacheError;

/// Name of the lock file inside the cache root. Never treated as a cache key.
pub const LOCK_FILE: &str = ".lock";

/// A guard that holds an exclusive lock on a cache root for one run.
/// Lock is released when dropped.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
}

impl CacheLock {
    /// Take the lock without blocking.
    /// Creates the cache root if needed; fails with `CacheError::Locked` if
    /// another process already holds it.
    pub fn acquire(root: &Path) -> Result<Self, CacheError> {
        let io_err = |source: io::Error| CacheError::Io {
            path: root.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(root).map_err(io_err)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))
            .map_err(io_err)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Err(CacheError::Locked(root.to_path_buf()))
            }
            Err(e) => Err(io_err(e)),
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_creates_root_and_lock_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cache");

        let lock = CacheLock::acquire(&root).unwrap();
        assert!(root.join(LOCK_FILE).exists());

        drop(lock);
    }

    #[test]
    fn test_second_acquire_is_rejected_while_held() {
        let dir = tempdir().unwrap();

        let _lock = CacheLock::acquire(dir.path()).unwrap();
        let err = CacheLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, CacheError::Locked(_)));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();

        let lock = CacheLock::acquire(dir.path()).unwrap();
        drop(lock);

        assert!(CacheLock::acquire(dir.path()).is_ok());
    }
}

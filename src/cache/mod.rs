//! Persistent cache of observed remote state

pub mod keys;
mod lock;
mod observed;
mod store;

pub use lock::CacheLock;
pub use observed::Cache;
#[cfg(test)]
pub use store::MemoryStore;
pub use store::{CacheError, CacheStore, FsStore};

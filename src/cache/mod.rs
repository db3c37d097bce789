//! Cache storage module.
//!
//! The agent's only persistent state lives here: named cache generations
//! mapping request identities to stored responses. The `CacheStorage` and
//! `CacheGeneration` traits are the seam the agent goes through; two
//! backends ship with the crate:
//!
//! - `MemoryCacheStorage` for in-process hosts and tests
//! - `DiskCacheStorage` for hosts that persist across restarts

pub mod disk;
pub mod memory;
pub mod storage;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use storage::{CacheError, CacheGeneration, CacheStorage, StoredEntry};

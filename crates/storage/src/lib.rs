//! Storage layer for Passage
//!
//! This crate provides local persistence for the mobile core:
//! key-value storage for small settings and credentials, versioned
//! snapshot files for session state, and a tiered cache for server data.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod kv;
pub mod snapshot;

pub use cache::{CacheConfig, CacheError, MemoryCache, TieredCache};
pub use kv::{DeviceStore, KvConfig, KvError, KvStore};
pub use snapshot::{SnapshotConfig, SnapshotError, SnapshotStore};

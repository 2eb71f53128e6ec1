//! Named asset cache with cache-first serving.
//!
//! This module provides the caching core:
//! - Stores HTTP responses in a named, durable cache keyed by request URL
//! - Populates the cache from a fixed manifest, all-or-nothing
//! - Serves requests cache-first, falling back to the network on a miss

mod manager;
mod storage;
mod types;

pub use manager::AssetCacheManager;
pub use storage::{CacheStorage, SqliteStorage};
pub use types::{CacheConfig, CachedAsset, ServeResult, ServeSource, StoredAsset};

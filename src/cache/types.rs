//! Core types for the asset caching system.

use chrono::{DateTime, Utc};
use url::Url;

/// Immutable cache configuration: which named cache to populate and the
/// manifest of assets it must hold.
#[derive(Debug, Clone)]
pub struct CacheConfig {
  /// Name of the cache the manifest installs into (e.g. "sc-stock-cache-v1")
  pub cache_name: String,
  /// Resolved absolute URLs to pre-cache at install time
  pub manifest: Vec<Url>,
}

/// A stored HTTP response, keyed by the request URL it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
  /// Absolute request URL (exact-match lookup key)
  pub url: String,
  /// HTTP status code of the response
  pub status: u16,
  /// Response headers as name/value pairs, in wire order
  pub headers: Vec<(String, String)>,
  /// Response body bytes
  pub body: Vec<u8>,
}

impl CachedAsset {
  /// Whether the response carries a success status (2xx).
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Look up a header value by case-insensitive name.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// A cached asset together with the time it entered the cache.
#[derive(Debug, Clone)]
pub struct StoredAsset {
  /// The stored response
  pub asset: CachedAsset,
  /// When the response was stored
  pub cached_at: DateTime<Utc>,
}

/// Result of serving a request, including where the response came from.
#[derive(Debug, Clone)]
pub struct ServeResult {
  /// The response
  pub asset: CachedAsset,
  /// Where the response came from
  pub source: ServeSource,
  /// When the response was cached (None for network responses)
  pub cached_at: Option<DateTime<Utc>>,
}

impl ServeResult {
  /// A response served from the cache without touching the network.
  pub fn from_cache(asset: CachedAsset, cached_at: DateTime<Utc>) -> Self {
    Self {
      asset,
      source: ServeSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// A response fetched live from the network after a cache miss.
  pub fn from_network(asset: CachedAsset) -> Self {
    Self {
      asset,
      source: ServeSource::Network,
      cached_at: None,
    }
  }
}

/// Indicates where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
  /// Exact match found in a named cache
  Cache,
  /// Cache miss, fetched from the network
  Network,
}

impl std::fmt::Display for ServeSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ServeSource::Cache => write!(f, "cache"),
      ServeSource::Network => write!(f, "network"),
    }
  }
}

//! Asset cache manager: manifest installation and cache-first serving.

use color_eyre::{eyre::eyre, Result};
use futures::future;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::storage::CacheStorage;
use super::types::{CacheConfig, CachedAsset, ServeResult, StoredAsset};

/// Manages a named asset cache: populates it from the manifest and answers
/// requests cache-first with a network fallback.
///
/// Network access is injected as async closures, so the manager itself only
/// decides when the network is consulted.
pub struct AssetCacheManager<S: CacheStorage> {
  storage: Arc<S>,
  config: CacheConfig,
}

impl<S: CacheStorage> AssetCacheManager<S> {
  /// Create a new manager over the given storage backend.
  pub fn new(storage: S, config: CacheConfig) -> Self {
    Self {
      storage: Arc::new(storage),
      config,
    }
  }

  /// Install the manifest into the named cache.
  ///
  /// Fetches every manifest URL (concurrently, failing fast) and stores the
  /// responses in a single transaction. Any fetch failure, or any response
  /// outside the 2xx range, fails the whole install and nothing from the
  /// attempt is retained.
  pub async fn install<F, Fut>(&self, fetch: F) -> Result<()>
  where
    F: Fn(Url) -> Fut,
    Fut: Future<Output = Result<CachedAsset>>,
  {
    let fetches = self.config.manifest.iter().map(|url| {
      let fut = fetch(url.clone());
      let url = url.clone();
      async move {
        let asset = fut.await?;
        if !asset.is_success() {
          return Err(eyre!("Install fetch of {} returned HTTP {}", url, asset.status));
        }
        debug!(%url, status = asset.status, bytes = asset.body.len(), "fetched manifest entry");
        Ok(asset)
      }
    });

    let assets = future::try_join_all(fetches).await?;
    self.storage.store_all(&self.config.cache_name, &assets)?;

    info!(
      cache = %self.config.cache_name,
      entries = assets.len(),
      "installed manifest into cache"
    );

    Ok(())
  }

  /// Serve a request cache-first.
  ///
  /// 1. Look the URL up across all named caches - on a hit, return the
  ///    stored response without touching the network
  /// 2. On a miss, invoke the fallback once and return its result unmodified
  ///
  /// This path never writes to the cache; network errors from the fallback
  /// propagate to the caller.
  pub async fn serve<F, Fut>(&self, url: &Url, fallback: F) -> Result<ServeResult>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CachedAsset>>,
  {
    if let Some(stored) = self.storage.match_url(url.as_str())? {
      debug!(%url, "cache hit");
      return Ok(ServeResult::from_cache(stored.asset, stored.cached_at));
    }

    debug!(%url, "cache miss, falling back to network");
    let asset = fallback().await?;

    Ok(ServeResult::from_network(asset))
  }

  /// Entries currently stored in the named cache.
  pub fn entries(&self) -> Result<Vec<StoredAsset>> {
    self.storage.entries(&self.config.cache_name)
  }
}

impl<S: CacheStorage> Clone for AssetCacheManager<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      config: self.config.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::SqliteStorage;
  use crate::cache::types::ServeSource;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn manager(manifest: &[&str]) -> AssetCacheManager<SqliteStorage> {
    let config = CacheConfig {
      cache_name: "app-v1".to_string(),
      manifest: manifest.iter().map(|u| Url::parse(u).unwrap()).collect(),
    };
    AssetCacheManager::new(SqliteStorage::open_in_memory().unwrap(), config)
  }

  fn asset_for(url: &Url, status: u16) -> CachedAsset {
    CachedAsset {
      url: url.to_string(),
      status,
      headers: vec![("content-type".to_string(), "text/plain".to_string())],
      body: url.path().as_bytes().to_vec(),
    }
  }

  #[tokio::test]
  async fn test_install_populates_named_cache() {
    let manager = manager(&["https://example.com/", "https://example.com/static/style.css"]);

    manager
      .install(|url| async move { Ok(asset_for(&url, 200)) })
      .await
      .unwrap();

    let entries = manager.entries().unwrap();
    assert_eq!(entries.len(), 2);

    let urls: Vec<&str> = entries.iter().map(|e| e.asset.url.as_str()).collect();
    assert_eq!(
      urls,
      vec!["https://example.com/", "https://example.com/static/style.css"]
    );
  }

  #[tokio::test]
  async fn test_install_is_all_or_nothing_on_fetch_failure() {
    let manager = manager(&["https://example.com/", "https://example.com/broken.png"]);

    let result = manager
      .install(|url| async move {
        if url.path() == "/broken.png" {
          Err(eyre!("connection refused"))
        } else {
          Ok(asset_for(&url, 200))
        }
      })
      .await;

    assert!(result.is_err());
    assert!(manager.entries().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_install_rejects_error_status() {
    let manager = manager(&["https://example.com/", "https://example.com/gone.css"]);

    let result = manager
      .install(|url| async move {
        let status = if url.path() == "/gone.css" { 404 } else { 200 };
        Ok(asset_for(&url, status))
      })
      .await;

    assert!(result.is_err());
    assert!(manager.entries().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_serve_hit_never_touches_network() {
    let manager = manager(&["https://example.com/"]);
    manager
      .install(|url| async move { Ok(asset_for(&url, 200)) })
      .await
      .unwrap();

    let calls = AtomicUsize::new(0);
    let url = Url::parse("https://example.com/").unwrap();

    let result = manager
      .serve(&url, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(asset_for(&Url::parse("https://example.com/").unwrap(), 200)) }
      })
      .await
      .unwrap();

    assert_eq!(result.source, ServeSource::Cache);
    assert!(result.cached_at.is_some());
    assert_eq!(result.asset.body, b"/");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_serve_miss_calls_network_once() {
    let manager = manager(&["https://example.com/"]);
    manager
      .install(|url| async move { Ok(asset_for(&url, 200)) })
      .await
      .unwrap();

    let calls = AtomicUsize::new(0);
    let url = Url::parse("https://example.com/other.png").unwrap();

    // A 404 from the network is still a response and comes back unmodified.
    let result = manager
      .serve(&url, || {
        calls.fetch_add(1, Ordering::SeqCst);
        let url = url.clone();
        async move { Ok(asset_for(&url, 404)) }
      })
      .await
      .unwrap();

    assert_eq!(result.source, ServeSource::Network);
    assert!(result.cached_at.is_none());
    assert_eq!(result.asset.status, 404);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_serve_miss_does_not_populate_cache() {
    let manager = manager(&[]);
    let calls = AtomicUsize::new(0);
    let url = Url::parse("https://example.com/other.png").unwrap();

    for _ in 0..2 {
      manager
        .serve(&url, || {
          calls.fetch_add(1, Ordering::SeqCst);
          let url = url.clone();
          async move { Ok(asset_for(&url, 200)) }
        })
        .await
        .unwrap();
    }

    // Both requests went to the network: the serve path is read-only.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(manager.entries().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_serve_network_error_propagates() {
    let manager = manager(&[]);
    let url = Url::parse("https://example.com/offline.js").unwrap();

    let result = manager
      .serve(&url, || async { Err(eyre!("dns failure")) })
      .await;

    assert!(result.is_err());
  }
}

//! Service wiring the HTTP client to the asset cache manager.

use color_eyre::Result;
use url::Url;

use crate::cache::{AssetCacheManager, ServeResult, SqliteStorage, StoredAsset};
use crate::config::Config;
use crate::net::HttpClient;

/// Asset cache service backed by the real network.
///
/// Wraps the cache manager and the HTTP client into the two host-facing
/// operations: install and cache-first fetch.
#[derive(Clone)]
pub struct PrecacheService {
  client: HttpClient,
  manager: AssetCacheManager<SqliteStorage>,
}

impl PrecacheService {
  /// Create a new service from configuration.
  pub fn new(config: &Config) -> Result<Self> {
    let client = HttpClient::new()?;
    let storage = SqliteStorage::open()?;
    let manager = AssetCacheManager::new(storage, config.cache_config()?);

    Ok(Self { client, manager })
  }

  /// Fetch every manifest entry and store it in the named cache.
  ///
  /// All-or-nothing: any failed fetch fails the install and nothing from
  /// the attempt is retained.
  pub async fn on_install(&self) -> Result<()> {
    self
      .manager
      .install(|url| {
        let client = self.client.clone();
        async move { client.fetch(&url).await }
      })
      .await
  }

  /// Serve a request cache-first, falling back to a live network fetch.
  pub async fn on_fetch(&self, url: &Url) -> Result<ServeResult> {
    self
      .manager
      .serve(url, || {
        let client = self.client.clone();
        let url = url.clone();
        async move { client.fetch(&url).await }
      })
      .await
  }

  /// Entries currently stored in the named cache.
  pub fn cached_entries(&self) -> Result<Vec<StoredAsset>> {
    self.manager.entries()
  }
}

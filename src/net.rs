//! HTTP client wrapper producing storable response records.

use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::Url;

use crate::cache::CachedAsset;

/// HTTP client for fetching assets.
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
}

impl HttpClient {
  /// Build a configured HTTP client.
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .pool_idle_timeout(Duration::from_secs(60))
      .pool_max_idle_per_host(8)
      .tcp_keepalive(Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }

  /// GET a URL and materialize the full response.
  ///
  /// Any HTTP status yields `Ok` (a 404 is a response, not a failure);
  /// only connect and transport errors are `Err`.
  pub async fn fetch(&self, url: &Url) -> Result<CachedAsset> {
    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .map(|(name, value)| {
        (
          name.as_str().to_string(),
          String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", url, e))?
      .to_vec();

    Ok(CachedAsset {
      url: url.to_string(),
      status,
      headers,
      body,
    })
  }
}

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cache::CacheConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub site: SiteConfig,
  pub cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
  /// Absolute URL that relative manifest entries resolve against
  pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
  /// Named cache identifier (a version bump means changing this name)
  pub name: String,
  /// Asset URLs to pre-cache; entries may be relative to base_url or absolute
  pub manifest: Vec<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./precache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/precache/config.yaml
  /// 4. ~/.config/precache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/precache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("precache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("precache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// The configured base URL, parsed and validated.
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.site.base_url)
      .map_err(|e| eyre!("Invalid base_url '{}': {}", self.site.base_url, e))
  }

  /// Resolve a possibly-relative URL against the base URL.
  pub fn resolve_url(&self, raw: &str) -> Result<Url> {
    // Joining an absolute URL against the base returns it unchanged,
    // so manifest entries may mix relative paths and absolute URLs.
    self
      .base_url()?
      .join(raw)
      .map_err(|e| eyre!("Cannot resolve URL '{}': {}", raw, e))
  }

  /// Build the immutable cache configuration: the named cache plus the
  /// manifest resolved to absolute URLs, in manifest order.
  pub fn cache_config(&self) -> Result<CacheConfig> {
    let manifest = self
      .cache
      .manifest
      .iter()
      .map(|raw| self.resolve_url(raw))
      .collect::<Result<Vec<Url>>>()?;

    Ok(CacheConfig {
      cache_name: self.cache.name.clone(),
      manifest,
    })
  }
}

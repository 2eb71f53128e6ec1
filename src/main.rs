mod cache;
mod config;
mod net;
mod service;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use service::PrecacheService;

#[derive(Parser, Debug)]
#[command(name = "precache")]
#[command(about = "Pre-caches a manifest of web assets and serves them cache-first")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/precache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch every manifest entry into the named cache
  Install,
  /// Fetch a URL cache-first, writing the body to stdout or a file
  Fetch {
    /// Request URL; relative URLs resolve against the configured base_url
    url: String,

    /// Write the response body to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// List the contents of the named cache
  List,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let service = PrecacheService::new(&config)?;

  match args.command {
    Command::Install => {
      service.on_install().await?;
    }
    Command::Fetch { url, output } => {
      let url = config.resolve_url(&url)?;
      let result = service.on_fetch(&url).await?;

      info!(
        %url,
        source = %result.source,
        status = result.asset.status,
        content_type = result.asset.header("content-type").unwrap_or("-"),
        "served"
      );

      match output {
        Some(path) => std::fs::write(&path, &result.asset.body)
          .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?,
        None => std::io::stdout()
          .write_all(&result.asset.body)
          .map_err(|e| eyre!("Failed to write response body: {}", e))?,
      }
    }
    Command::List => {
      for entry in service.cached_entries()? {
        println!(
          "{}\t{}\t{}",
          entry.asset.url,
          entry.asset.status,
          entry.cached_at.format("%Y-%m-%d %H:%M:%S")
        );
      }
    }
  }

  Ok(())
}

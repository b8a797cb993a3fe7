//! funil-api server binary.
//!
//! Reads `config.toml` (or the path given with `--config`, with `FUNIL_*`
//! environment overrides), opens the SQLite-backed document/settings store
//! and the asset vault, and serves the JSON API over HTTP.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use funil_api::{AppState, DEFAULT_MAX_UPLOAD_BYTES};
use funil_assets::{AssetVault, VaultConfig};
use funil_core::store::DocumentStore as _;
use funil_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Funil lead-funnel API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  host:                String,
  port:                u16,
  /// Document/settings database. Leaving it unset is a configuration error
  /// reported at connect time.
  database_path:       Option<PathBuf>,
  assets_registry_path: Option<PathBuf>,
  max_upload_bytes:    Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080_i64)?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FUNIL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the document/settings store. An unset database path surfaces as a
  // MissingConnectionTarget error here, before the server binds.
  let store = match &server_cfg.database_path {
    Some(path) => SqliteStore::new(path),
    None => SqliteStore::unconfigured(),
  };
  store
    .connect()
    .await
    .context("failed to connect document store")?;

  let assets = AssetVault::new(VaultConfig {
    registry_path: server_cfg.assets_registry_path.clone(),
  });
  assets.connect().await.context("failed to open asset registry")?;

  let state = AppState::new(
    store,
    assets,
    server_cfg.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
  );
  let app = funil_api::router(state);

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

//! geobase-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid by
//! `GEOBASE_*` environment variables, opens the SQLite store and the upload
//! directory, and serves the JSON API over HTTP.
//!
//! Nested keys use `__` in the environment, e.g.
//! `GEOBASE_FILES__MAX_UPLOAD_BYTES=1048576`.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use geobase_api::{AppState, ServerConfig, config::DEFAULT_JWT_SECRET};
use geobase_blob_fs::FileStore;
use geobase_core::{blob::BlobStore as _, store::GeoStore as _};
use geobase_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "GeoBase API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// List stored blobs that no attachment record refers to, then exit.
  #[arg(long)]
  report_orphans: bool,
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
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("GEOBASE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("files.image_file_endings"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.jwt_secret == DEFAULT_JWT_SECRET {
    tracing::warn!("jwt_secret is the built-in default; set GEOBASE_JWT_SECRET in production");
  }

  if let Some(parent) = server_cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  tokio::fs::create_dir_all(&server_cfg.temp_dir)
    .await
    .with_context(|| format!("failed to create temp dir {:?}", server_cfg.temp_dir))?;

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;
  let blobs = FileStore::open(&server_cfg.blob_dir)
    .await
    .with_context(|| format!("failed to open blob dir {:?}", server_cfg.blob_dir))?;

  if cli.report_orphans {
    return report_orphans(&store, &blobs).await;
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let enable_cors = server_cfg.enable_cors;

  let state = AppState::new(store, blobs, server_cfg);
  let mut app = geobase_api::router(state).layer(TraceLayer::new_for_http());
  if enable_cors {
    app = app.layer(CorsLayer::permissive());
  }

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Print `<id>\t<bytes>` for every blob without an attachment record.
async fn report_orphans(store: &SqliteStore, blobs: &FileStore) -> anyhow::Result<()> {
  let mut orphans = 0usize;
  for blob in blobs.list().await.context("failed to list blobs")? {
    if store
      .get_attachment(blob.id)
      .await
      .context("failed to look up attachment")?
      .is_none()
    {
      println!("{}\t{}", blob.id, blob.size);
      orphans += 1;
    }
  }
  tracing::info!(orphans, "orphan report complete");
  Ok(())
}

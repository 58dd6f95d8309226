//! formfill server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `FORMFILL_*` environment variables, opens the SQLite store, and serves the
//! JSON API under `/api`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use formfill_server::{Overrides, build_app, load_config};
use formfill_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "formfill mapping and profile server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Interface to bind; overrides the config file.
  #[arg(long)]
  host: Option<String>,

  /// Port to bind; overrides the config file.
  #[arg(short, long)]
  port: Option<u16>,
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
  let cfg = load_config(&cli.config, Overrides { host: cli.host, port: cli.port })?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let app = build_app(Arc::new(store), &cfg);
  let address = cfg.address();

  tracing::info!(
    owner_scoped = cfg.owner_scoped,
    store = %cfg.store_path.display(),
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

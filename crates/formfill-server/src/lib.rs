//! Wiring for the formfill server: configuration, the HTTP app, and its
//! middleware.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::{Router, http::HeaderValue};
use formfill_core::{service::WritePolicy, store::FormStore};
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  trace::TraceLayer,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `FORMFILL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Partition mappings by owner and require `ownerId` on capture.
  pub owner_scoped:       bool,
  pub max_write_attempts: u32,
  /// Allowed CORS origins. Empty allows any origin.
  pub cors_origins:       Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".into(),
      port:               5001,
      store_path:         PathBuf::from("formfill.db"),
      owner_scoped:       true,
      max_write_attempts: 3,
      cors_origins:       Vec::new(),
    }
  }
}

impl ServerConfig {
  pub fn write_policy(&self) -> WritePolicy {
    WritePolicy { owner_scoped: self.owner_scoped, max_attempts: self.max_write_attempts }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub host: Option<String>,
  pub port: Option<u16>,
}

/// Layer defaults, the optional TOML file at `path`, `FORMFILL_*` env vars,
/// then `overrides`.
pub fn load_config(path: &Path, overrides: Overrides) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("FORMFILL")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors_origins"),
    )
    .set_override_option("host", overrides.host)
    .context("invalid host override")?
    .set_override_option("port", overrides.port.map(i64::from))
    .context("invalid port override")?
    .build()
    .context("failed to read config")?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// The full application: the API under `/api`, wrapped in CORS and request
/// tracing.
pub fn build_app<S>(store: Arc<S>, cfg: &ServerConfig) -> Router
where
  S: FormStore + 'static,
{
  Router::new()
    .nest("/api", formfill_api::api_router(store, cfg.write_policy()))
    .layer(cors_layer(&cfg.cors_origins))
    .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
  let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
  if origins.is_empty() {
    return layer.allow_origin(Any);
  }

  let allowed: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
        None
      }
    })
    .collect();
  layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use formfill_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config(&dir.path().join("absent.toml"), Overrides::default()).unwrap();
    assert_eq!(cfg.port, 5001);
    assert_eq!(cfg.host, "127.0.0.1");
    assert!(cfg.owner_scoped);
    assert_eq!(cfg.write_policy(), WritePolicy::default());
  }

  #[test]
  fn file_values_and_cli_overrides_layer() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
      file,
      r#"
host = "0.0.0.0"
port = 8080
owner_scoped = false
max_write_attempts = 5
cors_origins = ["chrome-extension://abcdef"]
"#
    )
    .unwrap();

    let cfg = load_config(file.path(), Overrides::default()).unwrap();
    assert_eq!(cfg.address(), "0.0.0.0:8080");
    assert!(!cfg.owner_scoped);
    assert_eq!(cfg.max_write_attempts, 5);
    assert_eq!(cfg.cors_origins, ["chrome-extension://abcdef"]);
    assert_eq!(cfg.store_path, PathBuf::from("formfill.db"));

    let cfg = load_config(file.path(), Overrides {
      host: Some("localhost".into()),
      port: Some(9000),
    })
    .unwrap();
    assert_eq!(cfg.address(), "localhost:9000");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }

  async fn app(cfg: &ServerConfig) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    build_app(Arc::new(store), cfg)
  }

  fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
      .method("OPTIONS")
      .uri("/api/stats")
      .header(header::ORIGIN, origin)
      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
      .body(Body::empty())
      .unwrap()
  }

  #[tokio::test]
  async fn any_origin_by_default() {
    let resp = app(&ServerConfig::default())
      .await
      .oneshot(preflight("https://jobs.example.com"))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
  }

  #[tokio::test]
  async fn listed_origins_only() {
    let cfg = ServerConfig {
      cors_origins: vec!["chrome-extension://abcdef".into()],
      ..ServerConfig::default()
    };
    let allowed = app(&cfg)
      .await
      .oneshot(preflight("chrome-extension://abcdef"))
      .await
      .unwrap();
    assert_eq!(
      allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
      "chrome-extension://abcdef"
    );

    let denied = app(&cfg)
      .await
      .oneshot(preflight("https://evil.example"))
      .await
      .unwrap();
    assert!(!denied.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let resp = app(&ServerConfig::default())
      .await
      .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}

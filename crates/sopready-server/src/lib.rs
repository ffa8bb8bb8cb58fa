//! Server wiring for the SOP readiness service: configuration, catalog
//! seeding, and the top-level HTTP router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use serde::Deserialize;
use sopready_core::{
  Error as CoreError,
  clock::Clock,
  gap::GapAnalysis,
  requirement::NewRequirement,
  store::ComplianceStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `SOPREADY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// SOP requirements every deployment starts with. Entries whose code is
  /// already in the catalog are left alone.
  #[serde(default)]
  pub catalog:    Vec<NewRequirement>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("sopready.db") }

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SOPREADY"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory (`$HOME`).
pub fn expand_tilde(path: &Path) -> PathBuf {
  expand_tilde_in(path, std::env::var_os("HOME").map(PathBuf::from).as_deref())
}

fn expand_tilde_in(path: &Path, home: Option<&Path>) -> PathBuf {
  match (path.strip_prefix("~"), home) {
    (Ok(rest), Some(home)) => home.join(rest),
    _ => path.to_path_buf(),
  }
}

// ─── Catalog seeding ─────────────────────────────────────────────────────────

/// Add every catalog entry that is not yet present. Returns how many were
/// added.
pub async fn seed_catalog<S, C>(
  svc: &GapAnalysis<S, C>,
  catalog: &[NewRequirement],
) -> Result<usize, CoreError>
where
  S: ComplianceStore,
  C: Clock,
{
  let mut added = 0;
  for entry in catalog {
    match svc.add_requirement(entry.clone()).await {
      Ok(_) => added += 1,
      Err(CoreError::Duplicate(_)) => {
        tracing::debug!(code = %entry.code, "catalog entry already present");
      }
      Err(e) => return Err(e),
    }
  }
  if added > 0 {
    tracing::info!(added, "seeded SOP catalog");
  }
  Ok(added)
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: `/api/*` plus an unauthenticated `/health` check.
pub fn app<S, C>(svc: Arc<GapAnalysis<S, C>>) -> Router
where
  S: ComplianceStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", sopready_api::api_router(svc))
    .layer(TraceLayer::new_for_http())
}

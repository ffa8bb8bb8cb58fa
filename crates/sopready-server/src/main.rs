//! sopready server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, seeds the configured SOP catalog, and serves the gap
//! analysis API over HTTP.
//!
//! # One-shot commands
//!
//! ```text
//! sopready summary --order readiness_asc
//! sopready snapshot <facility-id>
//! ```
//!
//! `snapshot` is meant for scheduled captures (e.g. a monthly cron job).

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sopready_core::gap::{GapAnalysis, SummaryOrder};
use sopready_server::{ServerConfig, expand_tilde, seed_catalog};
use sopready_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "SOP compliance readiness service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the facility readiness summary as JSON and exit.
  Summary {
    /// name, code, readiness_asc or readiness_desc.
    #[arg(long, default_value = "name")]
    order: SummaryOrder,
  },
  /// Capture a readiness snapshot for one facility and print it as JSON.
  Snapshot {
    facility_id: Uuid,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so one-shot JSON output stays clean.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let svc = Arc::new(GapAnalysis::with_system_clock(Arc::new(store)));
  seed_catalog(&svc, &server_cfg.catalog)
    .await
    .context("failed to seed SOP catalog")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      let app = sopready_server::app(svc);
      let address = server_cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::Summary { order } => {
      let summary = svc.summary(order).await.context("failed to compute summary")?;
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Command::Snapshot { facility_id } => {
      let snapshot = svc
        .take_snapshot(facility_id)
        .await
        .with_context(|| format!("failed to snapshot facility {facility_id}"))?;
      println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
  }

  Ok(())
}

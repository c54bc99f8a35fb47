//! `glyco` — telemetry sync CLI.
//!
//! Reads `config.toml` (or the path given with `--config`, with `GLYCO_*`
//! environment overrides) and runs one of:
//!
//! - `parse` — a single fetch-reconcile-commit cycle
//! - `loop`  — repeating cycles at the configured interval
//! - `serve` — the authenticated REST facade
//! - `print` — the latest rows as a console status block
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for the users file:
//!
//! ```text
//! glyco hash-password
//! ```

mod display;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use glyco_api::{AppState, auth::TokenAuthority, users::UserRegistry};
use glyco_client::{RemoteConfig, RemoteStore};
use glyco_core::store::TelemetryStore;
use glyco_nightscout::{NightscoutConfig, NightscoutSource};
use glyco_store_sqlite::SqliteStore;
use glyco_sync::{SyncConfig, driver::SyncDriver};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use display::DisplayConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "glyco telemetry sync")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run one fetch-reconcile-commit cycle and print the outcome.
  Parse,
  /// Run cycles forever at the configured interval.
  Loop,
  /// Serve the authenticated REST facade.
  Serve,
  /// Print the latest glucose/dose/device rows.
  Print,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which store the sync driver writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreMode {
  /// Straight into a local SQLite file.
  Local,
  /// Through the REST facade on another host.
  Remote,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct StoreConfig {
  path: PathBuf,
  mode: StoreMode,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self { path: PathBuf::from("glyco.db"), mode: StoreMode::Local }
  }
}

/// Shape of the full configuration file. Sections are optional until the
/// chosen subcommand needs them.
#[derive(Debug, Deserialize)]
struct GlycoConfig {
  #[serde(default)]
  store:    StoreConfig,
  upstream: Option<NightscoutConfig>,
  #[serde(default)]
  sync:     SyncConfig,
  api:      Option<glyco_api::ApiConfig>,
  remote:   Option<RemoteConfig>,
  #[serde(default)]
  display:  DisplayConfig,
}

fn load_config(path: &Path) -> anyhow::Result<GlycoConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix("GLYCO").separator("__"))
    .build()
    .context("failed to read config file")?;
  settings
    .try_deserialize()
    .context("failed to deserialise configuration")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

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

  // Helper mode: hash a password and exit, no config needed.
  if matches!(cli.command, Command::HashPassword) {
    let password = read_password_from_stdin()?;
    let hash = UserRegistry::hash_password(&password)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let config = load_config(&cli.config)?;

  match cli.command {
    Command::Parse => run_sync(config, false).await,
    Command::Loop => run_sync(config, true).await,
    Command::Serve => run_serve(config).await,
    Command::Print => run_print(config).await,
    Command::HashPassword => unreachable!("handled above"),
  }
}

// ─── Sync modes ───────────────────────────────────────────────────────────────

async fn run_sync(config: GlycoConfig, repeat: bool) -> anyhow::Result<()> {
  let upstream = config
    .upstream
    .context("[upstream] section required for parse/loop")?;
  let source = NightscoutSource::new(upstream).context("building upstream client")?;

  match config.store.mode {
    StoreMode::Local => {
      let path = expand_tilde(&config.store.path);
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      drive(SyncDriver::new(source, store, config.sync), repeat, &config.display).await
    }
    StoreMode::Remote => {
      let remote = config
        .remote
        .context("[remote] section required when store.mode = \"remote\"")?;
      let store = RemoteStore::new(remote).context("building remote store client")?;
      drive(SyncDriver::new(source, store, config.sync), repeat, &config.display).await
    }
  }
}

async fn drive<S>(
  driver: SyncDriver<NightscoutSource, S>,
  repeat: bool,
  display: &DisplayConfig,
) -> anyhow::Result<()>
where
  S: TelemetryStore,
{
  if !repeat {
    let outcome = driver.run_once().await;
    println!("{outcome}");
    return Ok(());
  }

  let interval = Duration::from_secs(driver.config().interval_secs);
  if !display.enabled {
    driver.run_forever(interval).await;
    return Ok(());
  }

  // Looping with the console status block between cycles. The last printed
  // id is explicit state here, threaded through every call.
  let mut last_printed = None;
  loop {
    let outcome = driver.run_once().await;
    tracing::info!(%outcome, "sync cycle complete");
    if let Err(e) = display::print_status(driver.store(), &mut last_printed).await {
      tracing::warn!(error = %e, "status display failed");
    }
    tokio::time::sleep(interval).await;
  }
}

// ─── Serve mode ───────────────────────────────────────────────────────────────

async fn run_serve(config: GlycoConfig) -> anyhow::Result<()> {
  let api_config = config.api.context("[api] section required for serve")?;

  let store_path = expand_tilde(&config.store.path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let users_path = expand_tilde(&api_config.users_path);
  let users = UserRegistry::load(&users_path)
    .map_err(|e| anyhow::anyhow!("loading users file {users_path:?}: {e}"))?;

  let state = AppState {
    store:  Arc::new(store),
    tokens: Arc::new(TokenAuthority::new(
      api_config.secret.clone(),
      api_config.token_life_minutes,
    )),
    users:  Arc::new(users),
  };

  let app = glyco_api::router(state);
  let address = format!("{}:{}", api_config.host, api_config.port);

  tracing::info!("listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

// ─── Print mode ───────────────────────────────────────────────────────────────

async fn run_print(config: GlycoConfig) -> anyhow::Result<()> {
  let path = expand_tilde(&config.store.path);
  let store = SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))?;
  display::print_status(&store, &mut None).await
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Read a password from stdin.
fn read_password_from_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

//! docket server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `DOCKET_*` environment variables, opens the SQLite store and serves the
//! web interface over HTTP.
//!
//! # First run
//!
//! ```
//! DOCKET_SECRET_KEY=... cargo run -p docket-web --bin server -- --seed
//! ```
//!
//! creates the roles and the default `admin` and `user` accounts before
//! serving.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use docket_store_sqlite::SqliteStore;
use docket_web::{AppState, ServerConfig, StoreLocation, auth, seed};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Docket incident register")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create the roles and default accounts if they are missing.
  #[arg(long)]
  seed: bool,
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

  if cli.hash_password {
    let password = read_password()?;
    let hash = auth::hash_password(&password)?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DOCKET"))
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store = match server_cfg.store_location() {
    StoreLocation::Memory => {
      tracing::warn!("using an in-memory database; records are not persisted");
      SqliteStore::open_in_memory()
        .await
        .context("failed to open in-memory store")?
    }
    StoreLocation::File(path) => SqliteStore::open(&path)
      .await
      .with_context(|| format!("failed to open store at {path:?}"))?,
  };

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, server_cfg)
    .context("invalid server configuration")?;

  if cli.seed {
    let seeded = seed::populate(state.store.as_ref())
      .await
      .context("failed to seed the database")?;
    tracing::info!(users = seeded.users, "seeding finished");
  }

  let app = docket_web::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

//! HTTP layer for Docket.
//!
//! Exposes an axum [`Router`] serving the incident register's HTML pages,
//! backed by any [`RecordStore`].

pub mod auth;
pub mod error;
pub mod flash;
pub mod guard;
pub mod handlers;
pub mod render;
pub mod seed;
pub mod session;


pub use error::{Error, SetupError};

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use docket_core::store::RecordStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{incidents, login, participants, persons, reports};
use render::Templates;
use session::SessionKey;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DOCKET_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_database_url")]
  pub database_url:        String,
  /// Key for signing session cookies. Has no default.
  pub secret_key:          String,
  #[serde(default = "default_session_ttl_minutes")]
  pub session_ttl_minutes: i64,
  #[serde(default = "default_remember_days")]
  pub remember_days:       i64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }
fn default_database_url() -> String { "sqlite://app.db".to_string() }
fn default_session_ttl_minutes() -> i64 { 120 }
fn default_remember_days() -> i64 { 30 }

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
  Memory,
  File(PathBuf),
}

impl ServerConfig {
  /// Parse `database_url`: `sqlite://<path>`, `sqlite:<path>`, a bare path,
  /// or `sqlite::memory:` / `:memory:` for a throwaway store.
  pub fn store_location(&self) -> StoreLocation {
    let url = self.database_url.trim();
    let path = url
      .strip_prefix("sqlite://")
      .or_else(|| url.strip_prefix("sqlite:"))
      .unwrap_or(url);
    if path == ":memory:" {
      StoreLocation::Memory
    } else {
      StoreLocation::File(PathBuf::from(path))
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RecordStore> {
  pub store:     Arc<S>,
  pub config:    Arc<ServerConfig>,
  pub sessions:  Arc<SessionKey>,
  pub templates: Arc<Templates>,
}

impl<S: RecordStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Result<Self, SetupError> {
    if config.secret_key.len() < 32 {
      return Err(SetupError::SecretTooShort);
    }
    auth::warm_up();
    Ok(Self {
      sessions:  Arc::new(SessionKey::new(config.secret_key.as_bytes())?),
      templates: Arc::new(Templates::load()?),
      store:     Arc::new(store),
      config:    Arc::new(config),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RecordStore + Clone + 'static,
{
  Router::new()
    .route("/",                          get(handlers::index::<S>))
    .route("/login",                     get(login::form::<S>).post(login::submit::<S>))
    .route("/logout",                    get(login::logout::<S>))
    .route("/incidents",                 get(incidents::list::<S>))
    .route("/incidents/add",             get(incidents::add_form::<S>).post(incidents::add::<S>))
    .route("/incidents/edit/{id}",       get(incidents::edit_form::<S>).post(incidents::edit::<S>))
    .route("/persons",                   get(persons::list::<S>))
    .route("/persons/add",               get(persons::add_form::<S>).post(persons::add::<S>))
    .route("/persons/edit/{id}",         get(persons::edit_form::<S>).post(persons::edit::<S>))
    .route("/reports/incident_count",    get(reports::incident_count_form::<S>).post(reports::incident_count::<S>))
    .route("/reports/person_incident_count", get(reports::person_incident_count_form::<S>).post(reports::person_incident_count::<S>))
    .route("/incident_person/add",       get(participants::add_form::<S>).post(participants::add::<S>))
    .route("/incident/{id}/edit_participants", get(participants::edit_form::<S>).post(participants::edit::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

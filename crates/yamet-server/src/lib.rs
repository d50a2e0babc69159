//! HTTP layer for the YAMET admin backend.
//!
//! Exposes an axum [`Router`] serving the JSON API under `/api`, backed by
//! any [`Store`]. Every route authenticates with a bearer token (except the
//! handful of public ones) and consults the role policy before reading its
//! input.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = yamet_server::router(AppState::new(store, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod cors;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod reply;
pub mod upload;

#[cfg(test)]
mod tests;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use yamet_core::{normalize::NormalizerTables, store::Store};

use handlers::{attachments, auth as account, children, clinical, conversions, dashboard, health, notifications, settings};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Which CORS policy applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

/// Runtime server configuration, deserialised from `config.toml` plus
/// `YAMET_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                          String,
  pub port:                          u16,
  pub store_path:                    PathBuf,
  /// Attachments land in `{upload_dir}/lampiran`.
  pub upload_dir:                    PathBuf,
  pub environment:                   Environment,
  /// Allowed origins in production.
  pub cors_origins:                  Vec<String>,
  pub session_ttl_hours:             i64,
  pub bootstrap_admin_email:         Option<String>,
  pub bootstrap_admin_password_hash: Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                          "127.0.0.1".to_owned(),
      port:                          3000,
      store_path:                    PathBuf::from("yamet.db"),
      upload_dir:                    PathBuf::from("uploads"),
      environment:                   Environment::Development,
      cors_origins:                  Vec::new(),
      session_ttl_hours:             168,
      bootstrap_admin_email:         None,
      bootstrap_admin_password_hash: None,
    }
  }
}

impl ServerConfig {
  pub fn attachment_dir(&self) -> PathBuf { self.upload_dir.join(upload::ATTACHMENT_SUBDIR) }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  /// Complaint and referral-source mapping tables.
  pub tables: Arc<NormalizerTables>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
      tables: Arc::clone(&self.tables),
    }
  }
}

impl<S> AppState<S> {
  /// State with the built-in mapping tables.
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      config: Arc::new(config),
      tables: Arc::new(NormalizerTables::default()),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Room for every attachment slot at its size cap, plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = 8 * upload::MAX_FILE_BYTES;

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + 'static,
{
  let cors = cors::layer(&state.config);

  let api = Router::new()
    .route("/health", get(health::check::<S>))
    // Accounts
    .route("/auth/login", post(account::login::<S>))
    .route("/auth/register", post(account::register::<S>))
    .route("/auth/logout", post(account::logout::<S>))
    .route("/auth/profile", get(account::profile::<S>))
    .route("/auth/update", put(account::update_profile::<S>))
    .route("/auth/update-user", put(account::update_user::<S>))
    .route("/auth/users", get(account::list_users::<S>))
    .route("/auth/users/{id}", get(account::get_user::<S>))
    .route("/auth/toggle-active", post(account::toggle_active::<S>))
    // Children
    .route("/children", get(children::list::<S>).post(children::create::<S>))
    .route(
      "/children/{id}",
      get(children::get_one::<S>).put(children::update::<S>).delete(children::remove::<S>),
    )
    .route(
      "/children/{id}/assessment",
      get(clinical::list_assessments::<S>)
        .post(clinical::create_assessment::<S>)
        .put(clinical::update_assessment::<S>)
        .delete(clinical::delete_assessment::<S>),
    )
    .route(
      "/children/{id}/program-terapi",
      get(clinical::list_programs::<S>)
        .post(clinical::create_program::<S>)
        .put(clinical::update_program::<S>)
        .delete(clinical::delete_program::<S>),
    )
    .route(
      "/children/{id}/sessions",
      get(clinical::list_sessions::<S>).post(clinical::record_session::<S>),
    )
    .route(
      "/children/{id}/attachments",
      post(attachments::upload::<S>).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
    )
    .route("/lampiran/{filename}", get(attachments::download::<S>))
    // Analytics
    .route("/dashboard/stats", get(dashboard::stats::<S>))
    .route("/dashboard/normalized-stats", get(dashboard::normalized::<S>))
    .route(
      "/dashboard/normalized-stats/mapping",
      get(dashboard::mappings::<S>).post(dashboard::add_mapping::<S>),
    )
    .route("/marketing", get(dashboard::marketing_overview::<S>))
    .route("/marketing/dashboard", get(dashboard::marketing::<S>))
    .route("/marketing/konten", get(dashboard::marketing_content::<S>))
    .route("/marketing/target-audiens", get(dashboard::marketing_audience::<S>))
    // Conversions
    .route("/conversion", get(conversions::list::<S>).post(conversions::create::<S>))
    .route("/conversion/{id}", put(conversions::update::<S>).delete(conversions::remove::<S>))
    // Notifications
    .route("/notifikasi", get(notifications::list::<S>).post(notifications::create::<S>))
    .route("/notifikasi/user", get(notifications::mine::<S>))
    .route("/notifikasi/user/{id}", put(notifications::mark_read::<S>))
    .route(
      "/notifikasi/{id}",
      get(notifications::get_one::<S>)
        .put(notifications::update::<S>)
        .delete(notifications::remove::<S>),
    )
    // Settings
    .route("/setting-aplikasi", get(settings::get::<S>).put(settings::put::<S>));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

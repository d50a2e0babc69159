//! `GET /api/health`: liveness plus a `SELECT 1` against the database.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use yamet_core::store::Store;

use crate::AppState;

pub async fn check<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
  S: Store + 'static,
{
  let (status, healthy, database) = match state.store.ping().await {
    Ok(()) => (StatusCode::OK, "healthy", json!({ "status": "connected", "error": null })),
    Err(e) => {
      tracing::error!(error = %e, "health check failed");
      (
        StatusCode::SERVICE_UNAVAILABLE,
        "unhealthy",
        json!({ "status": "disconnected", "error": e.to_string() }),
      )
    }
  };
  (
    status,
    Json(json!({
      "status":    healthy,
      "timestamp": Utc::now().to_rfc3339(),
      "version":   env!("CARGO_PKG_VERSION"),
      "database":  database,
    })),
  )
}

//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the server as `{"status":"error","message":…}`.
//! Validation failures add `error_type`, `details` and `total_errors`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use yamet_core::intake::FieldIssue;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing, malformed or expired bearer token.
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("validation failed ({} issues)", .0.len())]
  Validation(Vec<FieldIssue>),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A unique key is already taken.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ApiError {
  pub fn forbidden() -> Self { ApiError::Forbidden("Akses ditolak. Role tidak diizinkan.".to_owned()) }

  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self { ApiError::Store(Box::new(e)) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::Unauthorized => (
        StatusCode::UNAUTHORIZED,
        json!({ "status": "error", "message": "Akses ditolak. Token tidak valid." }),
      ),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "status": "error", "message": m })),
      ApiError::Validation(issues) => (
        StatusCode::BAD_REQUEST,
        json!({
          "status":       "error",
          "message":      "Data tidak valid",
          "error_type":   "VALIDATION_ERROR",
          "total_errors": issues.len(),
          "details":      issues,
        }),
      ),
      ApiError::BadRequest(m) | ApiError::Conflict(m) => {
        (StatusCode::BAD_REQUEST, json!({ "status": "error", "message": m }))
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "status": "error", "message": m })),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        server_error()
      }
      ApiError::Io(e) => {
        tracing::error!(error = %e, "io failure");
        server_error()
      }
    };
    (status, Json(body)).into_response()
  }
}

fn server_error() -> (StatusCode, serde_json::Value) {
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    json!({ "status": "error", "message": "Terjadi kesalahan server" }),
  )
}

// ─── Extractor rejections ────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(_: PathRejection) -> Self { ApiError::BadRequest("ID tidak valid".to_owned()) }
}

//! Error type for `yamet-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] yamet_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored section is not a JSON object.
  #[error("section {0} is not an object")]
  MalformedSection(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Lift a store error into the error type `Connection::call` closures return.
pub(crate) fn other(e: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e.into()))
}

//! Error types for `yamet-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown {kind}: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

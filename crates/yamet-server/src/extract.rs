//! Extractor wrappers whose rejections render as [`ApiError`] envelopes
//! instead of axum's plain-text defaults.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Body<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathId<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Params<T>(pub T);

/// Read a query flag the way the admin UI sends it (`true`/`false`, any
/// case). Anything else means "no filter".
pub fn flag(raw: Option<&str>) -> Option<bool> {
  match raw.map(str::trim) {
    Some(s) if s.eq_ignore_ascii_case("true") => Some(true),
    Some(s) if s.eq_ignore_ascii_case("false") => Some(false),
    _ => None,
  }
}

/// A trimmed, non-empty query value.
pub fn present(raw: &Option<String>) -> Option<String> {
  raw.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

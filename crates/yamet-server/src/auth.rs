//! Bearer-token sessions, password hashing and the role gate.
//!
//! A login mints 32 random bytes, hands them to the client as URL-safe
//! base64 and stores only their SHA-256 hex digest.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::{FromRequestParts, OptionalFromRequestParts},
  http::{header, request::Parts},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use yamet_core::{
  policy::{Action, allows},
  store::Store,
  user::User,
};

use crate::{AppState, error::ApiError};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh token and the digest to persist for it.
pub fn issue_token() -> (String, String) {
  let mut raw = [0u8; 32];
  OsRng.fill_bytes(&mut raw);
  let token = B64.encode(raw);
  let digest = token_digest(&token);
  (token, digest)
}

pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn bearer(parts: &Parts) -> Option<&str> {
  parts
    .headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Present in a handler means the bearer token
/// named a live session of an active account.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user:       User,
  /// Digest of the presented token, used by logout.
  pub token_hash: String,
}

impl CurrentUser {
  /// Fail with 403 unless the caller's role may perform `action`.
  pub fn require(&self, action: Action) -> Result<(), ApiError> {
    if allows(self.user.role, action) { Ok(()) } else { Err(ApiError::forbidden()) }
  }
}

async fn resolve<S>(token: &str, state: &AppState<S>) -> Result<CurrentUser, ApiError>
where
  S: Store,
{
  let token_hash = token_digest(token);
  let user = state
    .store
    .session_user(token_hash.clone(), Utc::now())
    .await
    .map_err(ApiError::store)?
    .filter(User::is_active)
    .ok_or(ApiError::Unauthorized)?;
  Ok(CurrentUser { user, token_hash })
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: Store + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState<S>) -> Result<Self, Self::Rejection> {
    let token = bearer(parts).ok_or(ApiError::Unauthorized)?;
    resolve(token, state).await
  }
}

/// `Option<CurrentUser>`: no header means anonymous, a bad header is still
/// rejected.
impl<S> OptionalFromRequestParts<AppState<S>> for CurrentUser
where
  S: Store + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Option<Self>, Self::Rejection> {
    match bearer(parts) {
      None => Ok(None),
      Some(token) => resolve(token, state).await.map(Some),
    }
  }
}

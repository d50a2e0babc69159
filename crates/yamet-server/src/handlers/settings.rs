//! `GET`/`PUT /setting-aplikasi`: the application branding row.

use axum::extract::State;
use yamet_core::{policy::Action, settings::AppConfig, store::Store};

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::Body, reply::Reply};

/// `GET /setting-aplikasi`
///
/// Public. Every field is `null` until the first save.
pub async fn get<S>(State(state): State<AppState<S>>) -> Result<Reply<AppConfig>, ApiError>
where
  S: Store + 'static,
{
  let config = state.store.app_config().await.map_err(ApiError::store)?;
  Ok(Reply::ok(config.unwrap_or_default()))
}

/// `PUT /setting-aplikasi`
pub async fn put<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<AppConfig>,
) -> Result<Reply<AppConfig>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::UpdateSettings)?;
  body.validate().map_err(ApiError::Validation)?;
  let saved = state.store.put_app_config(body).await.map_err(ApiError::store)?;
  tracing::info!(user_id = current.user.id, "application settings updated");
  Ok(Reply::ok(saved).message("Setting aplikasi berhasil disimpan"))
}

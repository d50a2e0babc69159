//! Handlers for `/api/notifikasi` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/notifikasi` | SUPERADMIN; `?search&jenis_pemberitahuan&is_read&tujuan` |
//! | `POST`   | `/notifikasi` | SUPERADMIN |
//! | `GET`    | `/notifikasi/{id}` | SUPERADMIN |
//! | `PUT`    | `/notifikasi/{id}` | SUPERADMIN, partial |
//! | `DELETE` | `/notifikasi/{id}` | SUPERADMIN |
//! | `GET`    | `/notifikasi/user` | Addressed to the caller; `?is_read` |
//! | `PUT`    | `/notifikasi/user/{id}` | Mark one read |

use axum::extract::State;
use serde::Deserialize;
use yamet_core::{
  intake::FieldIssue,
  notification::{NewNotification, Notification, NotificationKind, NotificationPatch, NotificationQuery},
  policy::Action,
  store::Store,
};

use super::window;
use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Body, Params, PathId, flag, present},
  reply::Reply,
};

fn not_found() -> ApiError { ApiError::NotFound("Data notifikasi tidak ditemukan".to_owned()) }

fn parse_kind(raw: &str, issues: &mut Vec<FieldIssue>) -> Option<NotificationKind> {
  match raw.to_uppercase().parse() {
    Ok(kind) => Some(kind),
    Err(_) => {
      issues.push(FieldIssue::new(
        "jenis_pemberitahuan",
        "invalid_enum_value",
        "Jenis pemberitahuan harus salah satu dari: INFO, WARNING, SUCCESS, ERROR",
      ));
      None
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct NotificationBody {
  pub jenis_pemberitahuan: Option<String>,
  pub isi_notifikasi:      Option<String>,
  pub tujuan:              Option<String>,
  pub is_read:             Option<bool>,
}

impl NotificationBody {
  fn patch(&self) -> Result<NotificationPatch, ApiError> {
    let mut issues = Vec::new();
    let kind = present(&self.jenis_pemberitahuan).and_then(|k| parse_kind(&k, &mut issues));
    if !issues.is_empty() {
      return Err(ApiError::Validation(issues));
    }
    Ok(NotificationPatch {
      kind,
      body: present(&self.isi_notifikasi),
      destination: present(&self.tujuan),
      is_read: self.is_read,
    })
  }
}

// ─── Admin ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub page:                Option<u32>,
  pub limit:               Option<u32>,
  pub search:              Option<String>,
  pub jenis_pemberitahuan: Option<String>,
  pub is_read:             Option<String>,
  pub tujuan:              Option<String>,
}

/// `GET /notifikasi`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<ListParams>,
) -> Result<Reply<Vec<Notification>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageNotifications)?;
  let mut issues = Vec::new();
  let kind = present(&params.jenis_pemberitahuan).and_then(|k| parse_kind(&k, &mut issues));
  if !issues.is_empty() {
    return Err(ApiError::Validation(issues));
  }

  let (page, limit) = window(params.page, params.limit);
  let query = NotificationQuery {
    search: present(&params.search),
    kind,
    is_read: flag(params.is_read.as_deref()),
    destination: present(&params.tujuan),
    page,
    limit,
  };
  let found = state.store.list_notifications(&query).await.map_err(ApiError::store)?;
  Ok(Reply::page(found, page, limit))
}

/// `POST /notifikasi`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<NotificationBody>,
) -> Result<Reply<Notification>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageNotifications)?;
  let NotificationPatch { kind: Some(kind), body: Some(text), destination: Some(destination), .. } = body.patch()?
  else {
    return Err(ApiError::BadRequest(
      "Semua field harus diisi: jenis_pemberitahuan, isi_notifikasi, tujuan".to_owned(),
    ));
  };

  let created = state
    .store
    .create_notification(NewNotification { kind, body: text, destination, created_by: current.user.id })
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::created(created).message("Data notifikasi berhasil dibuat"))
}

/// `GET /notifikasi/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<Notification>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageNotifications)?;
  let found = state
    .store
    .get_notification(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Reply::ok(found))
}

/// `PUT /notifikasi/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
  Body(body): Body<NotificationBody>,
) -> Result<Reply<Notification>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageNotifications)?;
  let patch   = body.patch()?;
  let updated = state
    .store
    .update_notification(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Reply::ok(updated).message("Data notifikasi berhasil diupdate"))
}

/// `DELETE /notifikasi/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<()>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageNotifications)?;
  if !state.store.delete_notification(id).await.map_err(ApiError::store)? {
    return Err(not_found());
  }
  Ok(Reply::ok(()).message("Data notifikasi berhasil dihapus"))
}

// ─── Recipient ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InboxParams {
  pub page:    Option<u32>,
  pub limit:   Option<u32>,
  pub is_read: Option<String>,
}

/// `GET /notifikasi/user`
pub async fn mine<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<InboxParams>,
) -> Result<Reply<Vec<Notification>>, ApiError>
where
  S: Store + 'static,
{
  let (page, limit) = window(params.page, params.limit);
  let found = state
    .store
    .notifications_for(&current.user, flag(params.is_read.as_deref()), page, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::page(found, page, limit))
}

/// `PUT /notifikasi/user/{id}`
pub async fn mark_read<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<Notification>, ApiError>
where
  S: Store + 'static,
{
  let read = state
    .store
    .mark_read(&current.user, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Reply::ok(read).message("Notifikasi berhasil ditandai sebagai dibaca"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_is_case_insensitive() {
    let body = NotificationBody {
      jenis_pemberitahuan: Some("warning".into()),
      isi_notifikasi:      Some("Jadwal berubah".into()),
      tujuan:              Some("ROLE:TERAPIS".into()),
      is_read:             None,
    };
    assert_eq!(body.patch().unwrap().kind, Some(NotificationKind::Warning));
  }

  #[test]
  fn unknown_kind_is_a_validation_error() {
    let body = NotificationBody {
      jenis_pemberitahuan: Some("URGENT".into()),
      isi_notifikasi:      None,
      tujuan:              None,
      is_read:             None,
    };
    assert!(matches!(body.patch(), Err(ApiError::Validation(_))));
  }
}

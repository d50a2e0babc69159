//! Attachment upload and download.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/children/{id}/attachments` | Multipart, one part per slot. An empty part clears the slot |
//! | `GET`  | `/lampiran/{filename}` | Serves a stored file as a download |

use std::path::PathBuf;

use axum::{
  extract::{Multipart, State, multipart::MultipartRejection},
  http::header,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Map, Value};
use yamet_core::{intake::ATTACHMENT_SLOTS, policy::Action, store::Store};

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::PathId, reply::Reply, upload};

/// One slot's requested change.
enum SlotChange {
  Clear,
  Replace { name: String, bytes: Bytes },
}

/// Drain the form, refusing the whole upload if any file fails its checks.
async fn read_form(mut form: Multipart) -> Result<Vec<(String, SlotChange)>, ApiError> {
  let mut changes = Vec::new();
  while let Some(field) = form
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    let Some(slot) = field.name().filter(|n| ATTACHMENT_SLOTS.contains(n)).map(str::to_owned) else {
      continue;
    };
    let name  = field.file_name().unwrap_or_default().to_owned();
    let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if bytes.is_empty() {
      changes.push((slot, SlotChange::Clear));
      continue;
    }
    if let Err(refusal) = upload::check(&name, &bytes) {
      tracing::warn!(slot, file = name, size = bytes.len(), ?refusal, "attachment refused");
      return Err(ApiError::BadRequest(refusal.message(&slot)));
    }
    changes.push((slot, SlotChange::Replace { name, bytes }));
  }
  Ok(changes)
}

/// `POST /children/{id}/attachments`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  form: Result<Multipart, MultipartRejection>,
) -> Result<Reply<Map<String, Value>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::UploadAttachment)?;
  if !state.store.child_exists(child_id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound("Data anak tidak ditemukan".to_owned()));
  }
  let form    = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let changes = read_form(form).await?;
  if changes.is_empty() {
    return Err(ApiError::BadRequest("Tidak ada file yang diupload".to_owned()));
  }

  let dir = state.config.attachment_dir();
  tokio::fs::create_dir_all(&dir).await?;
  let previous = state
    .store
    .attachments(child_id)
    .await
    .map_err(ApiError::store)?
    .unwrap_or_default();

  // New files go to disk first and the section is persisted next. Replaced
  // files are only removed once the database points away from them.
  let mut patch    = Map::new();
  let mut written  = Vec::new();
  let mut replaced = Vec::new();
  for (slot, change) in changes {
    if let Some(old) = previous.get(&slot).and_then(Value::as_str).and_then(|url| upload::path_for_url(&dir, url)) {
      replaced.push(old);
    }
    match change {
      SlotChange::Clear => {
        patch.insert(slot, Value::Null);
      }
      SlotChange::Replace { name, bytes } => {
        let stored = upload::stored_name(Utc::now().timestamp_millis(), &name);
        let path   = dir.join(&stored);
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
          remove_files(&written).await;
          return Err(e.into());
        }
        written.push(path);
        tracing::info!(child_id, slot, file = stored, size = bytes.len(), "attachment stored");
        patch.insert(slot, Value::String(format!("{}{stored}", upload::URL_PREFIX)));
      }
    }
  }

  let section = match state.store.store_attachments(child_id, patch).await {
    Ok(section) => section,
    Err(e) => {
      remove_files(&written).await;
      return Err(ApiError::store(e));
    }
  };
  remove_files(&replaced).await;
  Ok(Reply::ok(section).message("Lampiran berhasil diupload"))
}

/// Remove `paths`, ignoring files that are already gone.
async fn remove_files(paths: &[PathBuf]) {
  for path in paths {
    match tokio::fs::remove_file(path).await {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove attachment file"),
    }
  }
}

/// `GET /lampiran/{filename}`
pub async fn download<S>(
  State(state): State<AppState<S>>,
  PathId(filename): PathId<String>,
) -> Result<Response, ApiError>
where
  S: Store + 'static,
{
  if !upload::is_safe_name(&filename) {
    return Err(ApiError::BadRequest("Nama file tidak valid".to_owned()));
  }
  let path = state.config.attachment_dir().join(&filename);
  let contents = match tokio::fs::read(&path).await {
    Ok(contents) => contents,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(ApiError::NotFound("File tidak ditemukan".to_owned()));
    }
    Err(e) => return Err(e.into()),
  };

  let mime        = mime_guess::from_path(&path).first_or_octet_stream();
  let disposition = format!("attachment; filename=\"{}\"", upload::display_name(&filename));
  Ok(
    (
      [(header::CONTENT_TYPE, mime.essence_str().to_owned()), (header::CONTENT_DISPOSITION, disposition)],
      contents,
    )
      .into_response(),
  )
}

//! Handlers for `/api/conversion`, the monthly marketing figures.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/conversion` | `?page&limit&search&bulan&tahun` |
//! | `POST`   | `/conversion` | Every field required |
//! | `PUT`    | `/conversion/{id}` | Partial |
//! | `DELETE` | `/conversion/{id}` | SUPERADMIN |
//!
//! Counts may arrive as JSON numbers or numeric strings.

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use yamet_core::{
  conversion::{Conversion, ConversionInput, ConversionPatch, ConversionQuery},
  intake::FieldIssue,
  policy::Action,
  store::{ConversionWrite, Store},
};

use super::window;
use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Body, Params, PathId, present},
  reply::Reply,
};

fn not_found() -> ApiError { ApiError::NotFound("Data conversion tidak ditemukan".to_owned()) }

/// A non-negative whole number given as a number or a numeric string.
fn count_field(field: &str, raw: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Option<i64> {
  let parsed = match raw? {
    Value::Null => return None,
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  };
  match parsed {
    Some(n) if n >= 0 => Some(n),
    _ => {
      issues.push(FieldIssue::new(field, "invalid_type", "Harus berupa angka bulat tidak negatif"));
      None
    }
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversionBody {
  pub bulan:              Option<String>,
  pub tahun:              Option<Value>,
  pub jumlah_leads:       Option<Value>,
  pub jumlah_conversi:    Option<Value>,
  pub jumlah_anak_keluar: Option<Value>,
}

impl ConversionBody {
  fn patch(&self) -> Result<ConversionPatch, ApiError> {
    let mut issues = Vec::new();
    let tahun = count_field("tahun", self.tahun.as_ref(), &mut issues);
    let tahun = match tahun.map(i32::try_from) {
      None => None,
      Some(Ok(t)) => Some(t),
      Some(Err(_)) => {
        issues.push(FieldIssue::new("tahun", "too_big", "Tahun tidak valid"));
        None
      }
    };
    let patch = ConversionPatch {
      bulan: present(&self.bulan),
      tahun,
      jumlah_leads: count_field("jumlah_leads", self.jumlah_leads.as_ref(), &mut issues),
      jumlah_conversi: count_field("jumlah_conversi", self.jumlah_conversi.as_ref(), &mut issues),
      jumlah_anak_keluar: count_field("jumlah_anak_keluar", self.jumlah_anak_keluar.as_ref(), &mut issues),
    };
    if issues.is_empty() { Ok(patch) } else { Err(ApiError::Validation(issues)) }
  }

  fn input(&self) -> Result<ConversionInput, ApiError> {
    let patch = self.patch()?;
    match patch {
      ConversionPatch {
        bulan: Some(bulan),
        tahun: Some(tahun),
        jumlah_leads: Some(jumlah_leads),
        jumlah_conversi: Some(jumlah_conversi),
        jumlah_anak_keluar: Some(jumlah_anak_keluar),
      } => Ok(ConversionInput { bulan, tahun, jumlah_leads, jumlah_conversi, jumlah_anak_keluar }),
      _ => Err(ApiError::BadRequest(
        "Semua field harus diisi: jumlah_anak_keluar, jumlah_leads, jumlah_conversi, bulan, tahun".to_owned(),
      )),
    }
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub page:   Option<u32>,
  pub limit:  Option<u32>,
  pub search: Option<String>,
  pub bulan:  Option<String>,
  pub tahun:  Option<i32>,
}

/// `GET /conversion`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<ListParams>,
) -> Result<Reply<Vec<Conversion>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewConversions)?;
  let (page, limit) = window(params.page, params.limit);
  let query = ConversionQuery {
    search: present(&params.search),
    bulan: present(&params.bulan),
    tahun: params.tahun,
    page,
    limit,
  };
  let found = state.store.list_conversions(&query).await.map_err(ApiError::store)?;
  Ok(Reply::page(found, page, limit))
}

/// `POST /conversion`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<ConversionBody>,
) -> Result<Reply<Conversion>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteConversions)?;
  let input = body.input()?;
  let (bulan, tahun) = (input.bulan.clone(), input.tahun);

  match state
    .store
    .create_conversion(input, current.user.id)
    .await
    .map_err(ApiError::store)?
  {
    ConversionWrite::Saved(row) => Ok(Reply::created(row).message("Data conversion berhasil dibuat")),
    ConversionWrite::Duplicate => Err(ApiError::Conflict(format!(
      "Data conversion untuk bulan {bulan} tahun {tahun} sudah ada"
    ))),
    ConversionWrite::NotFound => Err(not_found()),
  }
}

/// `PUT /conversion/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
  Body(body): Body<ConversionBody>,
) -> Result<Reply<Conversion>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteConversions)?;
  let patch = body.patch()?;

  match state
    .store
    .update_conversion(id, patch, current.user.id)
    .await
    .map_err(ApiError::store)?
  {
    ConversionWrite::Saved(row) => Ok(Reply::ok(row).message("Data conversion berhasil diupdate")),
    ConversionWrite::Duplicate => {
      Err(ApiError::Conflict("Data conversion untuk bulan dan tahun ini sudah ada".to_owned()))
    }
    ConversionWrite::NotFound => Err(not_found()),
  }
}

/// `DELETE /conversion/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<()>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::DeleteConversion)?;
  if !state.store.delete_conversion(id).await.map_err(ApiError::store)? {
    return Err(not_found());
  }
  Ok(Reply::ok(()).message("Data conversion berhasil dihapus"))
}

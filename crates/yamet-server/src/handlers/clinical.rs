//! Handlers for a child's clinical records.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/children/{id}/assessment` | `?page&limit`, newest assessment date first |
//! | `POST`   | `/children/{id}/assessment` | SUPERADMIN/ADMIN |
//! | `PUT`    | `/children/{id}/assessment?assessmentId=` | SUPERADMIN/ADMIN |
//! | `DELETE` | `/children/{id}/assessment?assessmentId=` | SUPERADMIN/ADMIN |
//! | `GET`    | `/children/{id}/program-terapi` | Same shape, `?programId=` |
//! | `GET`    | `/children/{id}/sessions` | Session log |
//! | `POST`   | `/children/{id}/sessions` | SUPERADMIN/ADMIN/TERAPIS |

use axum::extract::State;
use serde::Deserialize;
use yamet_core::{
  clinical::{
    Assessment, AssessmentInput, ProgramInput, ProgramStatus, SessionInput, TherapyProgram, TherapySession,
  },
  intake::FieldIssue,
  policy::Action,
  store::Store,
  user::Role,
};

use super::{Paging, date_field, text_field};
use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Body, Params, PathId},
  reply::Reply,
};

async fn ensure_child<S>(state: &AppState<S>, id: i64) -> Result<(), ApiError>
where
  S: Store,
{
  if state.store.child_exists(id).await.map_err(ApiError::store)? {
    Ok(())
  } else {
    Err(ApiError::NotFound("Data anak tidak ditemukan".to_owned()))
  }
}

fn required_id(raw: Option<i64>, name: &str) -> Result<i64, ApiError> {
  raw.ok_or_else(|| ApiError::BadRequest(format!("{name} wajib diisi")))
}

fn date_required(
  field:  &str,
  raw:    Option<&str>,
  issues: &mut Vec<FieldIssue>,
) -> Option<chrono::DateTime<chrono::Utc>> {
  let found = date_field(field, raw, issues);
  if found.is_none() && !issues.iter().any(|i| i.field == field) {
    issues.push(FieldIssue::new(field, "invalid_type", "Required"));
  }
  found
}

// ─── Assessments ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssessmentBody {
  pub assessment_date:   Option<String>,
  pub assessment_type:   Option<String>,
  pub assessment_result: Option<String>,
  pub notes:             Option<String>,
}

impl AssessmentBody {
  fn validate(self) -> Result<AssessmentInput, ApiError> {
    let mut issues = Vec::new();
    let date  = date_required("assessment_date", self.assessment_date.as_deref(), &mut issues);
    let kind  = text_field("assessment_type", self.assessment_type, &mut issues);
    match date {
      Some(assessment_date) if issues.is_empty() => Ok(AssessmentInput {
        assessment_date,
        assessment_type: kind,
        assessment_result: self.assessment_result,
        notes: self.notes,
      }),
      _ => Err(ApiError::Validation(issues)),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTarget {
  pub assessment_id: Option<i64>,
}

/// `GET /children/{id}/assessment`
pub async fn list_assessments<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(paging): Params<Paging>,
) -> Result<Reply<Vec<Assessment>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewChildren)?;
  ensure_child(&state, child_id).await?;
  let (page, limit) = paging.window();
  let found = state
    .store
    .list_assessments(child_id, page, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::page(found, page, limit))
}

/// `POST /children/{id}/assessment`
pub async fn create_assessment<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Body(body): Body<AssessmentBody>,
) -> Result<Reply<Assessment>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteClinical)?;
  let input = body.validate()?;
  ensure_child(&state, child_id).await?;
  let created = state
    .store
    .create_assessment(child_id, input, current.user.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::created(created).message("Assessment berhasil dibuat"))
}

/// `PUT /children/{id}/assessment?assessmentId=`
pub async fn update_assessment<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(target): Params<AssessmentTarget>,
  Body(body): Body<AssessmentBody>,
) -> Result<Reply<Assessment>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteClinical)?;
  let id    = required_id(target.assessment_id, "assessmentId")?;
  let input = body.validate()?;
  let updated = state
    .store
    .update_assessment(child_id, id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Assessment tidak ditemukan".to_owned()))?;
  Ok(Reply::ok(updated).message("Assessment berhasil diperbarui"))
}

/// `DELETE /children/{id}/assessment?assessmentId=`
pub async fn delete_assessment<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(target): Params<AssessmentTarget>,
) -> Result<Reply<()>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteClinical)?;
  let id = required_id(target.assessment_id, "assessmentId")?;
  if !state.store.delete_assessment(child_id, id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound("Assessment tidak ditemukan".to_owned()));
  }
  Ok(Reply::ok(()).message("Assessment berhasil dihapus"))
}

// ─── Programs ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProgramBody {
  pub program_name: Option<String>,
  pub description:  Option<String>,
  pub start_date:   Option<String>,
  pub end_date:     Option<String>,
  pub status:       Option<String>,
}

impl ProgramBody {
  fn validate(self) -> Result<ProgramInput, ApiError> {
    let mut issues = Vec::new();
    let program_name = text_field("program_name", self.program_name, &mut issues);
    let start_date   = date_field("start_date", self.start_date.as_deref(), &mut issues);
    let end_date     = date_field("end_date", self.end_date.as_deref(), &mut issues);
    if let (Some(start), Some(end)) = (start_date, end_date)
      && end < start
    {
      issues.push(FieldIssue::new("end_date", "custom", "Tanggal selesai harus setelah tanggal mulai"));
    }
    let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      None => ProgramStatus::default(),
      Some(raw) => raw.parse().unwrap_or_else(|_| {
        issues.push(FieldIssue::new("status", "invalid_enum_value", "Status tidak valid"));
        ProgramStatus::default()
      }),
    };
    if !issues.is_empty() {
      return Err(ApiError::Validation(issues));
    }
    Ok(ProgramInput { program_name, description: self.description, start_date, end_date, status })
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTarget {
  pub program_id: Option<i64>,
}

/// `GET /children/{id}/program-terapi`
pub async fn list_programs<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(paging): Params<Paging>,
) -> Result<Reply<Vec<TherapyProgram>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewChildren)?;
  ensure_child(&state, child_id).await?;
  let (page, limit) = paging.window();
  let found = state
    .store
    .list_programs(child_id, page, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::page(found, page, limit))
}

/// `POST /children/{id}/program-terapi`
pub async fn create_program<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Body(body): Body<ProgramBody>,
) -> Result<Reply<TherapyProgram>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteClinical)?;
  let input = body.validate()?;
  ensure_child(&state, child_id).await?;
  let created = state
    .store
    .create_program(child_id, input, current.user.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::created(created).message("Program terapi berhasil dibuat"))
}

/// `PUT /children/{id}/program-terapi?programId=`
pub async fn update_program<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(target): Params<ProgramTarget>,
  Body(body): Body<ProgramBody>,
) -> Result<Reply<TherapyProgram>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteClinical)?;
  let id    = required_id(target.program_id, "programId")?;
  let input = body.validate()?;
  let updated = state
    .store
    .update_program(child_id, id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Program terapi tidak ditemukan".to_owned()))?;
  Ok(Reply::ok(updated).message("Program terapi berhasil diperbarui"))
}

/// `DELETE /children/{id}/program-terapi?programId=`
pub async fn delete_program<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(target): Params<ProgramTarget>,
) -> Result<Reply<()>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteClinical)?;
  let id = required_id(target.program_id, "programId")?;
  if !state.store.delete_program(child_id, id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound("Program terapi tidak ditemukan".to_owned()));
  }
  Ok(Reply::ok(()).message("Program terapi berhasil dihapus"))
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SessionBody {
  pub tanggal_sesi: Option<String>,
  pub program_id:   Option<i64>,
  pub therapist_id: Option<i64>,
  pub notes:        Option<String>,
}

/// `GET /children/{id}/sessions`
pub async fn list_sessions<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Params(paging): Params<Paging>,
) -> Result<Reply<Vec<TherapySession>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewChildren)?;
  ensure_child(&state, child_id).await?;
  let (page, limit) = paging.window();
  let found = state
    .store
    .list_sessions(child_id, page, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::page(found, page, limit))
}

/// `POST /children/{id}/sessions`
///
/// A therapist logging their own session may omit `therapist_id`.
pub async fn record_session<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(child_id): PathId<i64>,
  Body(body): Body<SessionBody>,
) -> Result<Reply<TherapySession>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::RecordSession)?;
  let mut issues = Vec::new();
  let Some(tanggal_sesi) = date_required("tanggal_sesi", body.tanggal_sesi.as_deref(), &mut issues) else {
    return Err(ApiError::Validation(issues));
  };
  ensure_child(&state, child_id).await?;

  let therapist_id = body
    .therapist_id
    .or((current.user.role == Role::Therapist).then_some(current.user.id));
  let input = SessionInput { program_id: body.program_id, therapist_id, tanggal_sesi, notes: body.notes };
  let session = state
    .store
    .record_session(child_id, input, current.user.id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::BadRequest("Program atau terapis tidak valid untuk anak ini".to_owned()))?;
  Ok(Reply::created(session).message("Sesi terapi berhasil dicatat"))
}

//! Handlers for `/api/children` endpoints: the intake record and its
//! nested sections.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/children` | `?page&limit&search&status&startDate&endDate&sortBy&sortOrder` |
//! | `POST`   | `/children` | Full intake form; responds with a relation summary |
//! | `GET`    | `/children/{id}` | Every section plus the latest assessments and programs |
//! | `PUT`    | `/children/{id}` | Partial update, all-or-nothing |
//! | `DELETE` | `/children/{id}` | Soft delete |

use axum::extract::State;
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use yamet_core::{
  child::{Child, ChildFields, ChildQuery, ChildSort, ChildStatus, NewChild, child_number},
  intake::{FieldIssue, IntakeMode, Relation, RelationOutcome, child_fields, extract_sections},
  policy::Action,
  store::{ChildDetail, ChildRecord, Store, UpdateOutcome},
};

use super::{date_field, window};
use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Body, Params, PathId, present},
  reply::Reply,
};

fn not_found() -> ApiError { ApiError::NotFound("Data anak tidak ditemukan".to_owned()) }

/// Split an intake body into validated top-level fields and the raw nested
/// sections. Structural problems in either are reported together.
fn read_intake(
  body: &Value,
  mode: IntakeMode,
) -> Result<(ChildFields, Vec<(Relation, Value)>), ApiError> {
  let Value::Object(map) = body else {
    return Err(ApiError::Validation(vec![FieldIssue::new(
      "body",
      "invalid_type",
      "Expected object",
    )]));
  };
  let fields   = child_fields(map, mode);
  let sections = extract_sections(map);
  match (fields, sections) {
    (Ok(fields), Ok(sections)) => Ok((fields, sections)),
    (fields, sections) => {
      let mut issues = fields.err().unwrap_or_default();
      issues.extend(sections.err().unwrap_or_default());
      Err(ApiError::Validation(issues))
    }
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub page:       Option<u32>,
  pub limit:      Option<u32>,
  pub search:     Option<String>,
  pub status:     Option<String>,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub sort_by:    Option<String>,
  pub sort_order: Option<String>,
}

impl ListParams {
  fn query(&self) -> Result<ChildQuery, ApiError> {
    let mut issues = Vec::new();
    let status = match present(&self.status) {
      None => None,
      Some(raw) => match raw.parse::<ChildStatus>() {
        Ok(s) => Some(s),
        Err(_) => {
          issues.push(FieldIssue::new("status", "invalid_enum_value", "Status tidak valid"));
          None
        }
      },
    };
    let created_after  = date_field("startDate", self.start_date.as_deref(), &mut issues);
    let created_before = date_field("endDate", self.end_date.as_deref(), &mut issues);
    if !issues.is_empty() {
      return Err(ApiError::Validation(issues));
    }

    let (page, limit) = window(self.page, self.limit);
    Ok(ChildQuery {
      search: present(&self.search),
      status,
      created_after,
      created_before,
      sort: present(&self.sort_by).and_then(|s| s.parse().ok()).unwrap_or(ChildSort::CreatedAt),
      descending: !self.sort_order.as_deref().is_some_and(|o| o.eq_ignore_ascii_case("asc")),
      page,
      limit,
    })
  }
}

/// `GET /children`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<ListParams>,
) -> Result<Reply<Vec<ChildRecord>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewChildren)?;
  let query = params.query()?;
  let page  = state.store.list_children(&query).await.map_err(ApiError::store)?;
  Ok(Reply::page(page, query.page, query.limit))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSummary {
  pub anak:    Child,
  pub relasi:  Vec<RelationOutcome>,
  pub success: usize,
  pub failed:  usize,
}

/// `POST /children`
///
/// The child row always lands. Each nested section then succeeds or fails on
/// its own and is reported in `relasi`.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<Value>,
) -> Result<Reply<CreateSummary>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteChildren)?;
  let (fields, sections) = read_intake(&body, IntakeMode::Create)?;
  let Some(full_name) = fields.full_name.clone() else {
    return Err(ApiError::Validation(vec![FieldIssue::new("full_name", "invalid_type", "Required")]));
  };

  let now   = Utc::now();
  let input = NewChild {
    number: child_number(now, OsRng.next_u32()),
    full_name,
    fields,
    created_by: current.user.id,
  };
  let created = state
    .store
    .create_child(input, sections, now)
    .await
    .map_err(ApiError::store)?;

  for outcome in created.relations.iter().filter(|o| !o.is_success()) {
    tracing::warn!(
      child_id = created.child.id,
      relation = %outcome.relation,
      error = outcome.error.as_deref().unwrap_or_default(),
      "relation write failed"
    );
  }

  let success = created.relations.iter().filter(|o| o.is_success()).count();
  let failed  = created.relations.len() - success;
  Ok(
    Reply::created(CreateSummary { anak: created.child, relasi: created.relations, success, failed })
      .message("Data anak berhasil dibuat"),
  )
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /children/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<ChildDetail>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewChildren)?;
  let detail = state
    .store
    .get_child(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Reply::ok(detail))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /children/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
  Body(body): Body<Value>,
) -> Result<Reply<Child>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::WriteChildren)?;
  let (fields, sections) = read_intake(&body, IntakeMode::Update)?;

  let outcome = state
    .store
    .update_child(id, fields, sections, current.user.id, Utc::now())
    .await
    .map_err(ApiError::store)?;

  match outcome {
    UpdateOutcome::Updated(child) => Ok(Reply::ok(*child).message("Data anak berhasil diperbarui")),
    UpdateOutcome::NotFound => Err(not_found()),
    UpdateOutcome::Invalid(rejection) => {
      tracing::warn!(child_id = id, relation = %rejection.relation, "update rolled back");
      Err(ApiError::Validation(rejection.issues))
    }
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /children/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<Map<String, Value>>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::DeleteChild)?;
  let deleted = state
    .store
    .soft_delete_child(id, current.user.id, Utc::now())
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(not_found());
  }
  let mut data = Map::new();
  data.insert("id".to_owned(), Value::from(id));
  Ok(Reply::ok(data).message("Data anak berhasil dihapus"))
}

//! Analytics endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dashboard/stats` | `?period=`, default `1month`; shaped by role |
//! | `GET`  | `/dashboard/normalized-stats` | `?period=&maxItems=`, default `all` and 5 |
//! | `GET`  | `/dashboard/normalized-stats/mapping` | Current mapping tables |
//! | `POST` | `/dashboard/normalized-stats/mapping` | `{type, original, normalized}` |
//! | `GET`  | `/marketing` | MARKETING only; summary and recommendations |
//! | `GET`  | `/marketing/dashboard` | MARKETING only |
//! | `GET`  | `/marketing/konten` | MARKETING only; content ideas |
//! | `GET`  | `/marketing/target-audiens` | MARKETING only; audience profile |
//!
//! Each request takes one store snapshot and computes everything from it.

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use yamet_core::{
  dashboard::{DashboardStats, MarketingDashboard, NormalizedStats, dashboard_stats, marketing_dashboard, normalized_stats},
  intake::FieldIssue,
  marketing::{
    ContentInsight, MarketingOverview, TargetAudience, content_insight, marketing_overview as overview, target_audience,
  },
  normalize::{MappingKind, MappingSnapshot},
  policy::Action,
  store::Store,
  window::Window,
};

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Body, Params, present},
  reply::Reply,
};

const DEFAULT_MAX_ITEMS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsParams {
  pub period:    Option<String>,
  pub max_items: Option<usize>,
}

/// `GET /dashboard/stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<StatsParams>,
) -> Result<Reply<DashboardStats>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewDashboard)?;
  let window   = Window::parse_or(params.period.as_deref(), Window::OneMonth);
  let snapshot = state.store.dashboard_snapshot().await.map_err(ApiError::store)?;
  let stats    = dashboard_stats(&snapshot, &state.tables.mappings(), window, Utc::now());
  Ok(Reply::ok(stats.shaped_for(current.user.role)))
}

/// `GET /dashboard/normalized-stats`
pub async fn normalized<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<StatsParams>,
) -> Result<Reply<NormalizedStats>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewNormalizedStats)?;
  let window    = Window::parse_or(params.period.as_deref(), Window::All);
  let max_items = params.max_items.filter(|n| *n > 0).unwrap_or(DEFAULT_MAX_ITEMS);
  let snapshot  = state.store.dashboard_snapshot().await.map_err(ApiError::store)?;
  let stats     = normalized_stats(&snapshot, &state.tables.mappings(), window, max_items, Utc::now());
  Ok(Reply::ok(stats))
}

// ─── Mapping tables ──────────────────────────────────────────────────────────

/// `GET /dashboard/normalized-stats/mapping`
pub async fn mappings<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Reply<MappingSnapshot>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageMappings)?;
  Ok(Reply::ok(state.tables.mappings()))
}

#[derive(Debug, Deserialize)]
pub struct MappingBody {
  #[serde(rename = "type")]
  pub kind:       Option<String>,
  pub original:   Option<String>,
  pub normalized: Option<String>,
}

/// `POST /dashboard/normalized-stats/mapping`
///
/// The entry lives in memory only and is gone after a restart.
pub async fn add_mapping<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<MappingBody>,
) -> Result<Reply<MappingSnapshot>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ManageMappings)?;

  let mut issues = Vec::new();
  let kind = present(&body.kind).and_then(|k| k.to_lowercase().parse::<MappingKind>().ok());
  if kind.is_none() {
    issues.push(FieldIssue::new("type", "invalid_enum_value", "Type harus keluhan atau sumber"));
  }
  let original   = present(&body.original);
  let normalized = present(&body.normalized);
  if original.is_none() {
    issues.push(FieldIssue::new("original", "too_small", "Original wajib diisi"));
  }
  if normalized.is_none() {
    issues.push(FieldIssue::new("normalized", "too_small", "Normalized wajib diisi"));
  }
  let (Some(kind), Some(original), Some(normalized)) = (kind, original, normalized) else {
    return Err(ApiError::Validation(issues));
  };

  let snapshot = state.tables.add_mapping(kind, &original, &normalized);
  tracing::info!(kind = kind.as_ref(), original, normalized, user_id = current.user.id, "mapping added");
  Ok(Reply::ok(snapshot).message(format!("Mapping {} berhasil ditambahkan", kind.as_ref())))
}

// ─── Marketing ───────────────────────────────────────────────────────────────

/// `GET /marketing/dashboard`
pub async fn marketing<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Reply<MarketingDashboard>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewMarketing)?;
  let snapshot = state.store.dashboard_snapshot().await.map_err(ApiError::store)?;
  Ok(Reply::ok(marketing_dashboard(&snapshot, Utc::now())))
}

/// `GET /marketing`
pub async fn marketing_overview<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Reply<MarketingOverview>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewMarketing)?;
  let snapshot = state.store.dashboard_snapshot().await.map_err(ApiError::store)?;
  Ok(Reply::ok(overview(&snapshot)).message("Data marketing berhasil diambil"))
}

/// `GET /marketing/konten`
pub async fn marketing_content<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Reply<ContentInsight>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewMarketing)?;
  let snapshot = state.store.dashboard_snapshot().await.map_err(ApiError::store)?;
  let insight  = content_insight(&snapshot, Utc::now());
  Ok(Reply::ok(insight).message("Data konten marketing berhasil diambil"))
}

/// `GET /marketing/target-audiens`
pub async fn marketing_audience<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Reply<TargetAudience>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ViewMarketing)?;
  let snapshot = state.store.dashboard_snapshot().await.map_err(ApiError::store)?;
  let audience = target_audience(&snapshot, Utc::now());
  Ok(Reply::ok(audience).message("Data target audiens marketing berhasil diambil"))
}

//! The `Store` trait and the shapes it trades in.
//!
//! The trait is implemented by storage backends (`yamet-store-sqlite`). The
//! HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
  child::{Child, ChildFields, ChildQuery, NewChild},
  clinical::{Assessment, AssessmentInput, ProgramInput, SessionInput, TherapyProgram, TherapySession},
  conversion::{Conversion, ConversionInput, ConversionPatch, ConversionQuery},
  dashboard::DashboardSnapshot,
  intake::{Relation, RelationOutcome, SectionRejection},
  notification::{NewNotification, Notification, NotificationPatch, NotificationQuery},
  settings::AppConfig,
  user::{NewUser, Role, User, UserPatch, UserQuery, UserStatus},
};

// ─── Paging ──────────────────────────────────────────────────────────────────

/// Default page size for listings.
pub const DEFAULT_LIMIT: u32 = 10;

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

impl<T> Page<T> {
  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page { items: self.items.into_iter().map(f).collect(), total: self.total }
  }
}

/// The `pagination` object of listing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub page:        u32,
  pub limit:       u32,
  pub total:       u64,
  #[serde(rename = "totalPages")]
  pub total_pages: u64,
}

impl Pagination {
  pub fn new(page: u32, limit: u32, total: u64) -> Self {
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(u64::from(limit)) };
    Self { page, limit, total, total_pages }
  }
}

/// Clamp raw paging parameters and return `(page, limit, offset)`.
pub fn page_window(page: u32, limit: u32) -> (u32, u32, u64) {
  let page  = page.max(1);
  let limit = if limit == 0 { DEFAULT_LIMIT } else { limit.min(100) };
  (page, limit, u64::from(page - 1) * u64::from(limit))
}

/// Apply paging to an already-filtered, already-ordered list.
pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Page<T> {
  let (_, limit, offset) = page_window(page, limit);
  let total = items.len() as u64;
  let items = items
    .into_iter()
    .skip(offset as usize)
    .take(limit as usize)
    .collect();
  Page { items, total }
}

// ─── Child graph ─────────────────────────────────────────────────────────────

/// A child with every intake section, keyed by relation name. Sections not
/// yet written are `null` (or `[]` for collections).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildRecord {
  #[serde(flatten)]
  pub child:    Child,
  #[serde(flatten)]
  pub sections: Map<String, Value>,
}

impl ChildRecord {
  pub fn section(&self, relation: Relation) -> Option<&Value> {
    self.sections.get(relation.name()).filter(|v| !v.is_null())
  }
}

/// A child record plus its most recent clinical activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildDetail {
  #[serde(flatten)]
  pub record:         ChildRecord,
  /// Newest five by assessment date.
  pub penilaian:      Vec<Assessment>,
  /// Newest five by creation.
  pub program_terapi: Vec<TherapyProgram>,
}

/// Result of [`Store::create_child`]: the child is always persisted; each
/// nested write reports separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedChild {
  pub child:     Child,
  pub relations: Vec<RelationOutcome>,
}

/// Result of [`Store::update_user`].
#[derive(Debug, Clone)]
pub enum UserWrite {
  Updated(User),
  NotFound,
  /// Another account already uses the requested email.
  EmailTaken,
  /// Another account already uses the requested phone.
  PhoneTaken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
  Updated(Box<Child>),
  NotFound,
  /// A section failed validation; nothing was written.
  Invalid(SectionRejection),
}

// ─── Conversions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionWrite {
  Saved(Conversion),
  NotFound,
  /// Another row already holds this `(bulan, tahun)`.
  Duplicate,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a YAMET storage backend.
///
/// Soft-deleted children are invisible to every read: lookups return `None`
/// and listings and snapshots skip them.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Health ────────────────────────────────────────────────────────────

  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Users and sessions ────────────────────────────────────────────────

  /// Insert an account. Returns `None` if the email or phone is taken.
  fn create_user(&self, input: NewUser) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(&self, id: i64) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look an account up by email or phone, returning its password hash.
  fn find_login<'a>(
    &'a self,
    identifier: &'a str,
  ) -> impl Future<Output = Result<Option<(User, String)>, Self::Error>> + Send + 'a;

  fn list_users<'a>(
    &'a self,
    query: &'a UserQuery,
  ) -> impl Future<Output = Result<Page<User>, Self::Error>> + Send + 'a;

  /// Number of accounts per role, over all statuses.
  fn count_users_by_role(&self) -> impl Future<Output = Result<Vec<(Role, u64)>, Self::Error>> + Send + '_;

  /// Apply `patch` to an account, keeping email and phone unique.
  fn update_user(&self, id: i64, patch: UserPatch) -> impl Future<Output = Result<UserWrite, Self::Error>> + Send + '_;

  /// Returns `false` if the user does not exist.
  fn set_user_status(
    &self,
    id: i64,
    status: UserStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_session(
    &self,
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user owning an unexpired session.
  fn session_user(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Returns `false` if no such session existed.
  fn delete_session(&self, token_hash: String) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Children ──────────────────────────────────────────────────────────

  /// Insert the child, then write each section independently in the order
  /// given, then make sure a default assessment and program exist. Section
  /// failures are reported, not raised.
  fn create_child(
    &self,
    input: NewChild,
    sections: Vec<(Relation, Value)>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<CreatedChild, Self::Error>> + Send + '_;

  /// Update the child and every section in one transaction, applying the
  /// leave policy and default clinical records.
  fn update_child(
    &self,
    id: i64,
    fields: ChildFields,
    sections: Vec<(Relation, Value)>,
    actor: i64,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<UpdateOutcome, Self::Error>> + Send + '_;

  fn get_child(&self, id: i64) -> impl Future<Output = Result<Option<ChildDetail>, Self::Error>> + Send + '_;

  fn list_children<'a>(
    &'a self,
    query: &'a ChildQuery,
  ) -> impl Future<Output = Result<Page<ChildRecord>, Self::Error>> + Send + 'a;

  /// Stamp `deleted_at`/`deleted_by`. Returns `false` if the child is absent
  /// or already deleted.
  fn soft_delete_child(
    &self,
    id: i64,
    actor: i64,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn child_exists(&self, id: i64) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Clinical records ──────────────────────────────────────────────────

  /// Newest first by assessment date.
  fn list_assessments(
    &self,
    child_id: i64,
    page: u32,
    limit: u32,
  ) -> impl Future<Output = Result<Page<Assessment>, Self::Error>> + Send + '_;

  fn create_assessment(
    &self,
    child_id: i64,
    input: AssessmentInput,
    actor: i64,
  ) -> impl Future<Output = Result<Assessment, Self::Error>> + Send + '_;

  /// Returns `None` if the assessment does not belong to the child.
  fn update_assessment(
    &self,
    child_id: i64,
    id: i64,
    input: AssessmentInput,
  ) -> impl Future<Output = Result<Option<Assessment>, Self::Error>> + Send + '_;

  fn delete_assessment(
    &self,
    child_id: i64,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Newest first by creation.
  fn list_programs(
    &self,
    child_id: i64,
    page: u32,
    limit: u32,
  ) -> impl Future<Output = Result<Page<TherapyProgram>, Self::Error>> + Send + '_;

  fn create_program(
    &self,
    child_id: i64,
    input: ProgramInput,
    actor: i64,
  ) -> impl Future<Output = Result<TherapyProgram, Self::Error>> + Send + '_;

  fn update_program(
    &self,
    child_id: i64,
    id: i64,
    input: ProgramInput,
  ) -> impl Future<Output = Result<Option<TherapyProgram>, Self::Error>> + Send + '_;

  fn delete_program(
    &self,
    child_id: i64,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Newest first by session date.
  fn list_sessions(
    &self,
    child_id: i64,
    page: u32,
    limit: u32,
  ) -> impl Future<Output = Result<Page<TherapySession>, Self::Error>> + Send + '_;

  /// Returns `None` if `input.program_id` names a program of another child
  /// or `input.therapist_id` names no account.
  fn record_session(
    &self,
    child_id: i64,
    input: SessionInput,
    actor: i64,
  ) -> impl Future<Output = Result<Option<TherapySession>, Self::Error>> + Send + '_;

  // ── Attachments ───────────────────────────────────────────────────────

  /// The stored attachment section, or `None` if never written.
  fn attachments(&self, child_id: i64) -> impl Future<Output = Result<Option<Map<String, Value>>, Self::Error>> + Send + '_;

  /// Merge `patch` into the attachment section and return the result.
  fn store_attachments(
    &self,
    child_id: i64,
    patch: Map<String, Value>,
  ) -> impl Future<Output = Result<Map<String, Value>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn list_notifications<'a>(
    &'a self,
    query: &'a NotificationQuery,
  ) -> impl Future<Output = Result<Page<Notification>, Self::Error>> + Send + 'a;

  fn get_notification(&self, id: i64) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  fn create_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn update_notification(
    &self,
    id: i64,
    patch: NotificationPatch,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  fn delete_notification(&self, id: i64) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Notifications addressed to `user`, newest first.
  fn notifications_for<'a>(
    &'a self,
    user: &'a User,
    is_read: Option<bool>,
    page: u32,
    limit: u32,
  ) -> impl Future<Output = Result<Page<Notification>, Self::Error>> + Send + 'a;

  /// Mark read. Returns `None` if absent or not addressed to `user`.
  fn mark_read<'a>(
    &'a self,
    user: &'a User,
    id: i64,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + 'a;

  // ── Conversions ───────────────────────────────────────────────────────

  fn list_conversions<'a>(
    &'a self,
    query: &'a ConversionQuery,
  ) -> impl Future<Output = Result<Page<Conversion>, Self::Error>> + Send + 'a;

  fn create_conversion(
    &self,
    input: ConversionInput,
    actor: i64,
  ) -> impl Future<Output = Result<ConversionWrite, Self::Error>> + Send + '_;

  fn update_conversion(
    &self,
    id: i64,
    patch: ConversionPatch,
    actor: i64,
  ) -> impl Future<Output = Result<ConversionWrite, Self::Error>> + Send + '_;

  fn delete_conversion(&self, id: i64) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Settings ──────────────────────────────────────────────────────────

  fn app_config(&self) -> impl Future<Output = Result<Option<AppConfig>, Self::Error>> + Send + '_;

  fn put_app_config(&self, config: AppConfig) -> impl Future<Output = Result<AppConfig, Self::Error>> + Send + '_;

  // ── Analytics ─────────────────────────────────────────────────────────

  fn dashboard_snapshot(&self) -> impl Future<Output = Result<DashboardSnapshot, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pagination_rounds_pages_up() {
    assert_eq!(Pagination::new(1, 10, 21).total_pages, 3);
    assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
  }

  #[test]
  fn paginate_clamps_and_slices() {
    let page = paginate((1..=25).collect::<Vec<_>>(), 3, 10);
    assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
    assert_eq!(page.total, 25);
    assert_eq!(page_window(0, 0), (1, DEFAULT_LIMIT, 0));
  }
}

//! Handlers for `/api/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Public. `{email\|phone, password}` |
//! | `POST` | `/auth/register` | Public creates a pending parent; staff create by role |
//! | `POST` | `/auth/logout` | Revokes the presented token |
//! | `GET`  | `/auth/profile` | The caller |
//! | `PUT`  | `/auth/update` | The caller edits their own name, contacts or password |
//! | `PUT`  | `/auth/update-user` | `{userId, ...}`; SUPERADMIN, or ADMIN for therapists and parents |
//! | `GET`  | `/auth/users` | SUPERADMIN; `?page&limit&search` plus role counts |
//! | `GET`  | `/auth/users/{id}` | Self or SUPERADMIN |
//! | `POST` | `/auth/toggle-active` | `{userId, is_active}` |

use std::collections::BTreeMap;

use axum::extract::State;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use yamet_core::{
  intake::FieldIssue,
  policy::{Action, EditRefusal, allows, can_edit_user, can_register, can_toggle},
  store::{Store, UserWrite},
  user::{NewUser, Role, User, UserPatch, UserQuery, UserStatus},
};

use super::window;
use crate::{
  AppState,
  auth::{CurrentUser, hash_password, issue_token, verify_password},
  error::ApiError,
  extract::{Body, Params, PathId, present},
  reply::Reply,
};

const BAD_CREDENTIALS: &str = "Email/phone atau password salah";

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
  pub token: String,
  pub user:  User,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Body(body): Body<LoginBody>,
) -> Result<Reply<LoginData>, ApiError>
where
  S: Store + 'static,
{
  let identifier = present(&body.email).or_else(|| present(&body.phone));
  let password   = body.password.filter(|p| !p.is_empty());

  let mut issues = Vec::new();
  if identifier.is_none() {
    issues.push(FieldIssue::new("email", "custom", "Email atau phone harus diisi"));
  }
  if password.is_none() {
    issues.push(FieldIssue::new("password", "too_small", "Password wajib diisi"));
  }
  let (Some(identifier), Some(password)) = (identifier, password) else {
    return Err(ApiError::Validation(issues));
  };

  let (user, hash) = state
    .store
    .find_login(&identifier)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::BadRequest(BAD_CREDENTIALS.to_owned()))?;

  if !user.is_active() {
    return Err(ApiError::BadRequest("Akun tidak aktif. Silakan hubungi admin.".to_owned()));
  }
  if !verify_password(&password, &hash) {
    return Err(ApiError::BadRequest(BAD_CREDENTIALS.to_owned()));
  }

  let (token, digest) = issue_token();
  let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
  state
    .store
    .create_session(user.id, digest, expires_at)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = user.id, role = %user.role, "login");
  Ok(Reply::ok(LoginData { token, user }).message("Login berhasil"))
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub password: Option<String>,
  #[serde(alias = "role")]
  pub peran:    Option<String>,
}

/// `POST /auth/register`
///
/// Without a token the account is an `ORANGTUA` awaiting activation. With a
/// token the caller picks the role, within what [`can_register`] grants, and
/// the account is active at once.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  actor: Option<CurrentUser>,
  Body(body): Body<RegisterBody>,
) -> Result<Reply<User>, ApiError>
where
  S: Store + 'static,
{
  let target = match &actor {
    None => None,
    Some(actor) => {
      let requested = present(&body.peran).and_then(|r| r.parse::<Role>().ok());
      match requested {
        Some(role) if can_register(actor.user.role, role) => Some(role),
        Some(_) => return Err(ApiError::forbidden()),
        None => return Err(ApiError::Validation(vec![FieldIssue::new("peran", "invalid_enum_value", "Role tidak valid")])),
      }
    }
  };

  let mut issues = Vec::new();
  let name = present(&body.name).unwrap_or_default();
  if !(2..=100).contains(&name.chars().count()) {
    issues.push(FieldIssue::new("name", "too_small", "Nama minimal 2 karakter"));
  }
  let email = present(&body.email);
  let phone = present(&body.phone);
  if email.is_none() && phone.is_none() {
    issues.push(FieldIssue::new("email", "custom", "Email atau phone harus diisi"));
  }
  if email.as_deref().is_some_and(|e| !looks_like_email(e)) {
    issues.push(FieldIssue::new("email", "invalid_string", "Invalid email"));
  }
  let password = body.password.unwrap_or_default();
  if password.chars().count() < 6 {
    issues.push(FieldIssue::new("password", "too_small", "Password minimal 6 karakter"));
  }
  if !issues.is_empty() {
    return Err(ApiError::Validation(issues));
  }

  let password_hash = hash_password(&password)
    .map_err(|e| ApiError::Store(format!("argon2: {e}").into()))?;
  let input = NewUser {
    name,
    email,
    phone,
    role: target.unwrap_or(Role::Parent),
    status: if target.is_some() { UserStatus::Active } else { UserStatus::Pending },
    password_hash,
    created_by: actor.as_ref().map(|a| a.user.id),
  };

  let user = state
    .store
    .create_user(input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Conflict("Email atau phone sudah terdaftar".to_owned()))?;

  tracing::info!(user_id = user.id, role = %user.role, "account registered");
  Ok(Reply::created(user).message("User berhasil dibuat"))
}

fn looks_like_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
    None => false,
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Reply<()>, ApiError>
where
  S: Store + 'static,
{
  state
    .store
    .delete_session(current.token_hash)
    .await
    .map_err(ApiError::store)?;
  Ok(Reply::ok(()).message("Logout berhasil"))
}

/// `GET /auth/profile`
pub async fn profile<S>(current: CurrentUser) -> Reply<User>
where
  S: Store + 'static,
{
  Reply::ok(current.user)
}

// ─── Account edits ───────────────────────────────────────────────────────────

/// Fields every account edit may carry. Blank values are ignored.
#[derive(Debug, Deserialize)]
pub struct AccountFields {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub password: Option<String>,
}

impl AccountFields {
  /// Validate into a patch, adding to `issues` found earlier. The password is
  /// only hashed once everything else checks out.
  fn patch(&self, mut issues: Vec<FieldIssue>) -> Result<UserPatch, ApiError> {
    let name = present(&self.name);
    if name.as_ref().is_some_and(|n| !(2..=100).contains(&n.chars().count())) {
      issues.push(FieldIssue::new("name", "too_small", "Nama minimal 2 karakter"));
    }
    let email = present(&self.email);
    if email.as_deref().is_some_and(|e| !looks_like_email(e)) {
      issues.push(FieldIssue::new("email", "invalid_string", "Invalid email"));
    }
    let password = self.password.as_deref().filter(|p| !p.is_empty());
    if password.is_some_and(|p| p.chars().count() < 6) {
      issues.push(FieldIssue::new("password", "too_small", "Password minimal 6 karakter"));
    }
    if !issues.is_empty() {
      return Err(ApiError::Validation(issues));
    }

    let password_hash = password
      .map(hash_password)
      .transpose()
      .map_err(|e| ApiError::Store(format!("argon2: {e}").into()))?;
    Ok(UserPatch { name, email, phone: present(&self.phone), password_hash, ..Default::default() })
  }
}

fn written(outcome: UserWrite) -> Result<User, ApiError> {
  match outcome {
    UserWrite::Updated(user) => Ok(user),
    UserWrite::NotFound => Err(ApiError::NotFound("User tidak ditemukan".to_owned())),
    UserWrite::EmailTaken => Err(ApiError::BadRequest("Email sudah digunakan oleh user lain".to_owned())),
    UserWrite::PhoneTaken => Err(ApiError::BadRequest("Phone sudah digunakan oleh user lain".to_owned())),
  }
}

/// `PUT /auth/update`
pub async fn update_profile<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<AccountFields>,
) -> Result<Reply<User>, ApiError>
where
  S: Store + 'static,
{
  let patch = body.patch(Vec::new())?;
  let changed_password = patch.password_hash.is_some();
  let user = written(
    state
      .store
      .update_user(current.user.id, patch)
      .await
      .map_err(ApiError::store)?,
  )?;
  tracing::info!(user_id = user.id, changed_password, "profile updated");
  Ok(Reply::ok(user).message("User berhasil diupdate"))
}

#[derive(Debug, Deserialize)]
pub struct UserEditBody {
  #[serde(rename = "userId")]
  pub user_id: Option<i64>,
  #[serde(alias = "peran")]
  pub role:    Option<String>,
  pub status:  Option<String>,
  #[serde(flatten)]
  pub fields:  AccountFields,
}

/// `PUT /auth/update-user`
pub async fn update_user<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<UserEditBody>,
) -> Result<Reply<User>, ApiError>
where
  S: Store + 'static,
{
  if !matches!(current.user.role, Role::SuperAdmin | Role::Admin) {
    return Err(ApiError::Forbidden(EditRefusal::NotPermitted.message().to_owned()));
  }

  let mut issues = Vec::new();
  if body.user_id.is_none() {
    issues.push(FieldIssue::new("userId", "invalid_type", "Required"));
  }
  let role = present(&body.role).and_then(|r| match r.parse::<Role>() {
    Ok(role) => Some(role),
    Err(_) => {
      issues.push(FieldIssue::new("role", "invalid_enum_value", "Role tidak valid"));
      None
    }
  });
  let status = present(&body.status).and_then(|s| match s.parse::<UserStatus>() {
    Ok(status) => Some(status),
    Err(_) => {
      issues.push(FieldIssue::new(
        "status",
        "invalid_enum_value",
        "Status harus salah satu dari: active, inactive, pending",
      ));
      None
    }
  });
  let user_id = body.user_id;
  let mut patch = body.fields.patch(issues)?;
  let Some(user_id) = user_id else {
    return Err(ApiError::BadRequest("userId wajib diisi".to_owned()));
  };

  let target = state
    .store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("User tidak ditemukan".to_owned()))?;
  can_edit_user((current.user.id, current.user.role), (target.id, target.role), role)
    .map_err(|refusal| ApiError::Forbidden(refusal.message().to_owned()))?;

  patch.role   = role;
  patch.status = status;
  let user = written(state.store.update_user(user_id, patch).await.map_err(ApiError::store)?)?;
  tracing::info!(actor = current.user.id, user_id, role = %user.role, "account updated");
  Ok(Reply::ok(user).message("User berhasil diupdate"))
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserListParams {
  pub page:   Option<u32>,
  pub limit:  Option<u32>,
  pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListing {
  pub users:      Vec<User>,
  /// Account count per role name, over all statuses.
  pub statistics: BTreeMap<String, u64>,
}

/// `GET /auth/users`
pub async fn list_users<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<UserListParams>,
) -> Result<Reply<UserListing>, ApiError>
where
  S: Store + 'static,
{
  current.require(Action::ListUsers)?;
  let (page, limit) = window(params.page, params.limit);
  let query = UserQuery { search: present(&params.search), page, limit };

  let users = state.store.list_users(&query).await.map_err(ApiError::store)?;
  let statistics = state
    .store
    .count_users_by_role()
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|(role, n)| (role.to_string(), n))
    .collect();

  let total = users.total;
  Ok(Reply::ok(UserListing { users: users.items, statistics }).paginated(page, limit, total))
}

/// `GET /auth/users/{id}`
pub async fn get_user<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  PathId(id): PathId<i64>,
) -> Result<Reply<User>, ApiError>
where
  S: Store + 'static,
{
  if current.user.id != id && !allows(current.user.role, Action::ViewAnyUser) {
    return Err(ApiError::forbidden());
  }
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("User tidak ditemukan".to_owned()))?;
  Ok(Reply::ok(user))
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
  #[serde(rename = "userId")]
  pub user_id:   Option<i64>,
  pub is_active: Option<bool>,
}

/// `POST /auth/toggle-active`
pub async fn toggle_active<S>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Body(body): Body<ToggleBody>,
) -> Result<Reply<User>, ApiError>
where
  S: Store + 'static,
{
  if !matches!(current.user.role, Role::SuperAdmin | Role::Admin) {
    return Err(ApiError::forbidden());
  }
  let (Some(user_id), Some(is_active)) = (body.user_id, body.is_active) else {
    return Err(ApiError::BadRequest("userId dan is_active wajib diisi".to_owned()));
  };

  let target = state
    .store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("User tidak ditemukan".to_owned()))?;
  if !can_toggle(current.user.role, target.role) {
    return Err(ApiError::forbidden());
  }

  let status = if is_active { UserStatus::Active } else { UserStatus::Inactive };
  state
    .store
    .set_user_status(user_id, status)
    .await
    .map_err(ApiError::store)?;
  let user = state
    .store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("User tidak ditemukan".to_owned()))?;

  let message = if is_active { "User berhasil diaktifkan" } else { "User berhasil dinonaktifkan" };
  Ok(Reply::ok(user).message(message))
}

#[cfg(test)]
mod tests {
  use super::looks_like_email;

  #[test]
  fn email_shape() {
    assert!(looks_like_email("ibu.sari@mail.co.id"));
    assert!(!looks_like_email("ibu.sari"));
    assert!(!looks_like_email("@yamet.id"));
    assert!(!looks_like_email("a@localhost"));
  }
}

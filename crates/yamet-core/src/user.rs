//! Staff and parent accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The role a user acts under. Wire names follow the center's vocabulary.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
  #[serde(rename = "SUPERADMIN")]
  #[strum(serialize = "SUPERADMIN")]
  SuperAdmin,
  #[serde(rename = "MANAJER")]
  #[strum(serialize = "MANAJER")]
  Manager,
  #[serde(rename = "ADMIN")]
  #[strum(serialize = "ADMIN")]
  Admin,
  #[serde(rename = "TERAPIS")]
  #[strum(serialize = "TERAPIS")]
  Therapist,
  #[serde(rename = "ORANGTUA")]
  #[strum(serialize = "ORANGTUA")]
  Parent,
  #[serde(rename = "MARKETING")]
  #[strum(serialize = "MARKETING")]
  Marketing,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserStatus {
  #[default]
  Active,
  Inactive,
  Pending,
}

/// A persisted account. The password hash never leaves the store through this
/// type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:         i64,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  #[serde(rename = "peran")]
  pub role:       Role,
  pub status:     UserStatus,
  pub created_by: Option<i64>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn is_active(&self) -> bool { self.status == UserStatus::Active }
}

/// Input for [`crate::store::Store::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         Option<String>,
  pub phone:         Option<String>,
  pub role:          Role,
  pub status:        UserStatus,
  pub password_hash: String,
  pub created_by:    Option<i64>,
}

/// Changes to an account. `None` leaves a column as it is.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub phone:         Option<String>,
  pub role:          Option<Role>,
  pub status:        Option<UserStatus>,
  pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
  /// Case-insensitive match over name and email.
  pub search: Option<String>,
  pub page:   u32,
  pub limit:  u32,
}

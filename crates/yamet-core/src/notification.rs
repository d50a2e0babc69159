//! Broadcast notifications and their free-text destination.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::user::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum NotificationKind {
  Info,
  Warning,
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub id:                  i64,
  #[serde(rename = "jenis_pemberitahuan")]
  pub kind:                NotificationKind,
  #[serde(rename = "isi_notifikasi")]
  pub body:                String,
  /// Raw destination, see [`Destination`].
  #[serde(rename = "tujuan")]
  pub destination:         String,
  pub is_read:             bool,
  pub created_by:          i64,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
  pub kind:        NotificationKind,
  pub body:        String,
  pub destination: String,
  pub created_by:  i64,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct NotificationPatch {
  pub kind:        Option<NotificationKind>,
  pub body:        Option<String>,
  pub destination: Option<String>,
  pub is_read:     Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
  /// Case-insensitive match over the body and kind.
  pub search:      Option<String>,
  pub kind:        Option<NotificationKind>,
  pub is_read:     Option<bool>,
  /// Case-insensitive substring of the raw destination.
  pub destination: Option<String>,
  pub page:        u32,
  pub limit:       u32,
}

// ─── Destination ─────────────────────────────────────────────────────────────

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
  All,
  Role(Role),
  User(i64),
  /// A bare string: matched against the role name or the email.
  Name(String),
}

impl Destination {
  /// Parse the stored destination. Prefixes are case-insensitive. Anything
  /// that does not parse as a prefixed form is kept as a bare name.
  pub fn parse(raw: &str) -> Self {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("ALL") {
      return Destination::All;
    }
    if let Some((prefix, rest)) = s.split_once(':') {
      let rest = rest.trim();
      if prefix.eq_ignore_ascii_case("ROLE")
        && let Ok(role) = Role::from_str(rest)
      {
        return Destination::Role(role);
      }
      if prefix.eq_ignore_ascii_case("USER")
        && let Ok(id) = rest.parse()
      {
        return Destination::User(id);
      }
    }
    Destination::Name(s.to_owned())
  }

  pub fn includes(&self, user: &User) -> bool {
    match self {
      Destination::All => true,
      Destination::Role(role) => *role == user.role,
      Destination::User(id) => *id == user.id,
      Destination::Name(name) => {
        name.eq_ignore_ascii_case(user.role.as_ref())
          || user.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(name))
      }
    }
  }
}

impl Notification {
  pub fn addressed_to(&self, user: &User) -> bool { Destination::parse(&self.destination).includes(user) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::user::UserStatus;

  fn user(id: i64, role: Role, email: &str) -> User {
    User {
      id,
      name: "Test".into(),
      email: Some(email.into()),
      phone: None,
      role,
      status: UserStatus::Active,
      created_by: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn parses_prefixed_forms() {
    assert_eq!(Destination::parse("all"), Destination::All);
    assert_eq!(Destination::parse("ROLE:TERAPIS"), Destination::Role(Role::Therapist));
    assert_eq!(Destination::parse("role:admin"), Destination::Role(Role::Admin));
    assert_eq!(Destination::parse("USER:12"), Destination::User(12));
    assert_eq!(Destination::parse("USER:abc"), Destination::Name("USER:abc".into()));
  }

  #[test]
  fn matches_role_user_and_bare_names() {
    let therapist = user(7, Role::Therapist, "Tia@Yamet.id");
    assert!(Destination::parse("ALL").includes(&therapist));
    assert!(Destination::parse("ROLE:TERAPIS").includes(&therapist));
    assert!(!Destination::parse("ROLE:ADMIN").includes(&therapist));
    assert!(Destination::parse("USER:7").includes(&therapist));
    assert!(!Destination::parse("USER:8").includes(&therapist));
    assert!(Destination::parse("terapis").includes(&therapist));
    assert!(Destination::parse("tia@yamet.id").includes(&therapist));
    assert!(!Destination::parse("someone@yamet.id").includes(&therapist));
  }

  #[test]
  fn kind_wire_names() {
    assert_eq!(serde_json::to_string(&NotificationKind::Warning).unwrap(), "\"WARNING\"");
    assert_eq!("SUCCESS".parse::<NotificationKind>().unwrap(), NotificationKind::Success);
    assert!("NOTICE".parse::<NotificationKind>().is_err());
  }
}

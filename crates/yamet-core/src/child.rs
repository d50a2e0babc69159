//! The child record: the central intake entity.
//!
//! Only the identifying columns live here. Everything captured by the intake
//! form's nested sections is described in [`crate::intake`].

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{Error, Result};

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, AsRefStr, EnumString,
)]
pub enum ChildStatus {
  #[default]
  #[serde(rename = "AKTIF")]
  #[strum(serialize = "AKTIF")]
  Active,
  #[serde(rename = "CUTI")]
  #[strum(serialize = "CUTI")]
  OnLeave,
  #[serde(rename = "LULUS")]
  #[strum(serialize = "LULUS")]
  Graduated,
  #[serde(rename = "BERHENTI")]
  #[strum(serialize = "BERHENTI")]
  Stopped,
}

impl ChildStatus {
  /// Graduated and stopped children have left the program.
  pub fn has_left(self) -> bool {
    matches!(self, ChildStatus::Graduated | ChildStatus::Stopped)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
pub enum Gender {
  #[serde(rename = "LAKI_LAKI")]
  #[strum(serialize = "LAKI_LAKI")]
  Male,
  #[serde(rename = "PEREMPUAN")]
  #[strum(serialize = "PEREMPUAN")]
  Female,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Top-level columns accepted on create and update.
///
/// On create every `None` is stored as null and `status` defaults to
/// [`ChildStatus::Active`]. On update `None` means "leave unchanged" unless
/// the column's wire name is listed in `cleared`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildFields {
  pub full_name:     Option<String>,
  pub nick_name:     Option<String>,
  pub gender:        Option<Gender>,
  pub birth_date:    Option<DateTime<Utc>>,
  pub birth_place:   Option<String>,
  pub nationality:   Option<String>,
  pub religion:      Option<String>,
  pub birth_order:   Option<i64>,
  pub school_grade:  Option<String>,
  pub status:        Option<ChildStatus>,
  pub exam_date:     Option<DateTime<Utc>>,
  pub therapy_start: Option<DateTime<Utc>>,
  pub therapy_end:   Option<DateTime<Utc>>,
  pub leave_start:   Option<DateTime<Utc>>,
  /// Nullable columns an update sent as an explicit `null`.
  pub cleared:       Vec<&'static str>,
}

/// Wire names of the child columns an update may set to null.
pub const NULLABLE_COLUMNS: [&str; 12] = [
  "nick_name",
  "jenis_kelamin",
  "birth_date",
  "birth_place",
  "kewarganegaraan",
  "agama",
  "anak_ke",
  "sekolah_kelas",
  "tanggal_pemeriksaan",
  "mulai_terapi",
  "selesai_terapi",
  "mulai_cuti",
];

impl ChildFields {
  /// Whether the update asked for `column` to become null.
  pub fn clears(&self, column: &str) -> bool { self.cleared.iter().any(|c| *c == column) }
}

/// Input for [`crate::store::Store::create_child`].
#[derive(Debug, Clone)]
pub struct NewChild {
  pub number:     String,
  pub full_name:  String,
  pub fields:     ChildFields,
  pub created_by: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
  pub id:            i64,
  #[serde(rename = "nomor_anak")]
  pub number:        String,
  pub full_name:     String,
  pub nick_name:     Option<String>,
  #[serde(rename = "jenis_kelamin")]
  pub gender:        Option<Gender>,
  pub birth_date:    Option<DateTime<Utc>>,
  pub birth_place:   Option<String>,
  #[serde(rename = "kewarganegaraan")]
  pub nationality:   Option<String>,
  #[serde(rename = "agama")]
  pub religion:      Option<String>,
  #[serde(rename = "anak_ke")]
  pub birth_order:   Option<i64>,
  #[serde(rename = "sekolah_kelas")]
  pub school_grade:  Option<String>,
  pub status:        ChildStatus,
  #[serde(rename = "tanggal_pemeriksaan")]
  pub exam_date:     Option<DateTime<Utc>>,
  #[serde(rename = "mulai_terapi")]
  pub therapy_start: Option<DateTime<Utc>>,
  #[serde(rename = "selesai_terapi")]
  pub therapy_end:   Option<DateTime<Utc>>,
  #[serde(rename = "mulai_cuti")]
  pub leave_start:   Option<DateTime<Utc>>,
  pub created_by:    i64,
  pub updated_by:    Option<i64>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deleted_at:    Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deleted_by:    Option<i64>,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Columns a child listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
pub enum ChildSort {
  #[default]
  #[strum(serialize = "created_at")]
  CreatedAt,
  #[strum(serialize = "updated_at")]
  UpdatedAt,
  #[strum(serialize = "full_name")]
  FullName,
  #[strum(serialize = "nomor_anak")]
  Number,
  #[strum(serialize = "id")]
  Id,
}

/// Parameters for [`crate::store::Store::list_children`].
#[derive(Debug, Clone, Default)]
pub struct ChildQuery {
  /// Case-insensitive match over full name, nick name and child number.
  pub search:         Option<String>,
  pub status:         Option<ChildStatus>,
  pub created_after:  Option<DateTime<Utc>>,
  pub created_before: Option<DateTime<Utc>>,
  pub sort:           ChildSort,
  pub descending:     bool,
  pub page:           u32,
  pub limit:          u32,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// `YAMET-{year}-{nnnn}` from a random seed.
pub fn child_number(now: DateTime<Utc>, seed: u32) -> String {
  format!("YAMET-{}-{:04}", now.year(), seed % 10_000)
}

/// Parse a date coming from the intake form.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` without offset (read as
/// UTC) and bare `YYYY-MM-DD` dates (midnight UTC). An empty string means
/// "no date".
pub fn parse_date(raw: &str) -> Result<Option<DateTime<Utc>>> {
  let s = raw.trim();
  if s.is_empty() {
    return Ok(None);
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(Some(dt.with_timezone(&Utc)));
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
    return Ok(Some(naive.and_utc()));
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
    && let Some(naive) = date.and_hms_opt(0, 0, 0)
  {
    return Ok(Some(naive.and_utc()));
  }
  Err(Error::InvalidDate(raw.to_owned()))
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn child_number_is_zero_padded() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    assert_eq!(child_number(now, 42), "YAMET-2025-0042");
    assert_eq!(child_number(now, 123_456), "YAMET-2025-3456");
  }

  #[test]
  fn parse_date_accepts_form_shapes() {
    let expected = Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
    assert_eq!(parse_date("2024-05-17").unwrap(), Some(expected));
    assert_eq!(parse_date("2024-05-17T00:00:00Z").unwrap(), Some(expected));
    assert_eq!(parse_date("2024-05-17T00:00:00").unwrap(), Some(expected));
    assert_eq!(parse_date("  ").unwrap(), None);
    assert!(parse_date("17/05/2024").is_err());
  }

  #[test]
  fn status_wire_names() {
    let json = serde_json::to_string(&ChildStatus::OnLeave).unwrap();
    assert_eq!(json, "\"CUTI\"");
    assert!(ChildStatus::Stopped.has_left());
    assert!(!ChildStatus::OnLeave.has_left());
  }
}

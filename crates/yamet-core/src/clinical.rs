//! Assessments, therapy programs and the sessions delivered under them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

// ─── Assessment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
  pub id:                i64,
  #[serde(rename = "anak_id")]
  pub child_id:          i64,
  pub assessment_date:   DateTime<Utc>,
  pub assessment_type:   String,
  pub assessment_result: Option<String>,
  pub notes:             Option<String>,
  pub created_by:        i64,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Writable assessment columns, shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentInput {
  pub assessment_date:   DateTime<Utc>,
  pub assessment_type:   String,
  pub assessment_result: Option<String>,
  pub notes:             Option<String>,
}

// ─── Therapy program ─────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString,
)]
pub enum ProgramStatus {
  #[default]
  #[serde(rename = "AKTIF")]
  #[strum(serialize = "AKTIF")]
  Active,
  #[serde(rename = "SELESAI")]
  #[strum(serialize = "SELESAI")]
  Completed,
  #[serde(rename = "DIBATALKAN")]
  #[strum(serialize = "DIBATALKAN")]
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapyProgram {
  pub id:           i64,
  #[serde(rename = "anak_id")]
  pub child_id:     i64,
  pub program_name: String,
  pub description:  Option<String>,
  pub start_date:   Option<DateTime<Utc>>,
  pub end_date:     Option<DateTime<Utc>>,
  pub status:       ProgramStatus,
  pub created_by:   i64,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInput {
  pub program_name: String,
  pub description:  Option<String>,
  pub start_date:   Option<DateTime<Utc>>,
  pub end_date:     Option<DateTime<Utc>>,
  pub status:       ProgramStatus,
}

// ─── Therapy session ─────────────────────────────────────────────────────────

/// One delivered therapy session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapySession {
  pub id:           i64,
  #[serde(rename = "anak_id")]
  pub child_id:     i64,
  pub program_id:   Option<i64>,
  pub therapist_id: Option<i64>,
  pub tanggal_sesi: DateTime<Utc>,
  pub notes:        Option<String>,
  pub created_by:   i64,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionInput {
  pub program_id:   Option<i64>,
  pub therapist_id: Option<i64>,
  pub tanggal_sesi: DateTime<Utc>,
  pub notes:        Option<String>,
}

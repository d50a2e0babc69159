//! Encoding and decoding between domain types and SQLite column values.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so lexical order equals chronological order. Enums are stored
//! under their wire names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use yamet_core::{
  child::{Child, ChildStatus, Gender},
  clinical::{Assessment, ProgramStatus, TherapyProgram, TherapySession},
  conversion::Conversion,
  notification::{Notification, NotificationKind},
  user::{Role, User, UserStatus},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn decode_enum<E: FromStr>(kind: &'static str, s: &str) -> Result<E> {
  s.parse().map_err(|_| {
    Error::Core(yamet_core::Error::UnknownVariant { kind, value: s.to_owned() })
  })
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, name, email, phone, role, status, created_by, created_at, updated_at";

pub struct RawUser {
  pub id:         i64,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub role:       String,
  pub status:     String,
  pub created_by: Option<i64>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawUser {
  /// Reads [`USER_COLUMNS`] starting at column 0.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      phone:      row.get(3)?,
      role:       row.get(4)?,
      status:     row.get(5)?,
      created_by: row.get(6)?,
      created_at: row.get(7)?,
      updated_at: row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         self.id,
      name:       self.name,
      email:      self.email,
      phone:      self.phone,
      role:       decode_enum::<Role>("role", &self.role)?,
      status:     decode_enum::<UserStatus>("user status", &self.status)?,
      created_by: self.created_by,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Children ────────────────────────────────────────────────────────────────

pub const CHILD_COLUMNS: &str = "id, nomor_anak, full_name, nick_name, jenis_kelamin, birth_date, \
   birth_place, kewarganegaraan, agama, anak_ke, sekolah_kelas, status, tanggal_pemeriksaan, \
   mulai_terapi, selesai_terapi, mulai_cuti, created_by, updated_by, created_at, updated_at, \
   deleted_at, deleted_by";

pub struct RawChild {
  pub id:            i64,
  pub number:        String,
  pub full_name:     String,
  pub nick_name:     Option<String>,
  pub gender:        Option<String>,
  pub birth_date:    Option<String>,
  pub birth_place:   Option<String>,
  pub nationality:   Option<String>,
  pub religion:      Option<String>,
  pub birth_order:   Option<i64>,
  pub school_grade:  Option<String>,
  pub status:        String,
  pub exam_date:     Option<String>,
  pub therapy_start: Option<String>,
  pub therapy_end:   Option<String>,
  pub leave_start:   Option<String>,
  pub created_by:    i64,
  pub updated_by:    Option<i64>,
  pub created_at:    String,
  pub updated_at:    String,
  pub deleted_at:    Option<String>,
  pub deleted_by:    Option<i64>,
}

impl RawChild {
  /// Reads [`CHILD_COLUMNS`] starting at column 0.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      number:        row.get(1)?,
      full_name:     row.get(2)?,
      nick_name:     row.get(3)?,
      gender:        row.get(4)?,
      birth_date:    row.get(5)?,
      birth_place:   row.get(6)?,
      nationality:   row.get(7)?,
      religion:      row.get(8)?,
      birth_order:   row.get(9)?,
      school_grade:  row.get(10)?,
      status:        row.get(11)?,
      exam_date:     row.get(12)?,
      therapy_start: row.get(13)?,
      therapy_end:   row.get(14)?,
      leave_start:   row.get(15)?,
      created_by:    row.get(16)?,
      updated_by:    row.get(17)?,
      created_at:    row.get(18)?,
      updated_at:    row.get(19)?,
      deleted_at:    row.get(20)?,
      deleted_by:    row.get(21)?,
    })
  }

  pub fn into_child(self) -> Result<Child> {
    Ok(Child {
      id:            self.id,
      number:        self.number,
      full_name:     self.full_name,
      nick_name:     self.nick_name,
      gender:        self
        .gender
        .as_deref()
        .map(|g| decode_enum::<Gender>("gender", g))
        .transpose()?,
      birth_date:    decode_opt_dt(self.birth_date)?,
      birth_place:   self.birth_place,
      nationality:   self.nationality,
      religion:      self.religion,
      birth_order:   self.birth_order,
      school_grade:  self.school_grade,
      status:        decode_enum::<ChildStatus>("child status", &self.status)?,
      exam_date:     decode_opt_dt(self.exam_date)?,
      therapy_start: decode_opt_dt(self.therapy_start)?,
      therapy_end:   decode_opt_dt(self.therapy_end)?,
      leave_start:   decode_opt_dt(self.leave_start)?,
      created_by:    self.created_by,
      updated_by:    self.updated_by,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
      deleted_at:    decode_opt_dt(self.deleted_at)?,
      deleted_by:    self.deleted_by,
    })
  }
}

// ─── Clinical records ────────────────────────────────────────────────────────

pub const ASSESSMENT_COLUMNS: &str = "id, child_id, assessment_date, assessment_type, \
   assessment_result, notes, created_by, created_at, updated_at";

pub struct RawAssessment {
  pub id:                i64,
  pub child_id:          i64,
  pub assessment_date:   String,
  pub assessment_type:   String,
  pub assessment_result: Option<String>,
  pub notes:             Option<String>,
  pub created_by:        i64,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawAssessment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      child_id:          row.get(1)?,
      assessment_date:   row.get(2)?,
      assessment_type:   row.get(3)?,
      assessment_result: row.get(4)?,
      notes:             row.get(5)?,
      created_by:        row.get(6)?,
      created_at:        row.get(7)?,
      updated_at:        row.get(8)?,
    })
  }

  pub fn into_assessment(self) -> Result<Assessment> {
    Ok(Assessment {
      id:                self.id,
      child_id:          self.child_id,
      assessment_date:   decode_dt(&self.assessment_date)?,
      assessment_type:   self.assessment_type,
      assessment_result: self.assessment_result,
      notes:             self.notes,
      created_by:        self.created_by,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub const PROGRAM_COLUMNS: &str = "id, child_id, program_name, description, start_date, end_date, \
   status, created_by, created_at, updated_at";

pub struct RawProgram {
  pub id:           i64,
  pub child_id:     i64,
  pub program_name: String,
  pub description:  Option<String>,
  pub start_date:   Option<String>,
  pub end_date:     Option<String>,
  pub status:       String,
  pub created_by:   i64,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawProgram {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      child_id:     row.get(1)?,
      program_name: row.get(2)?,
      description:  row.get(3)?,
      start_date:   row.get(4)?,
      end_date:     row.get(5)?,
      status:       row.get(6)?,
      created_by:   row.get(7)?,
      created_at:   row.get(8)?,
      updated_at:   row.get(9)?,
    })
  }

  pub fn into_program(self) -> Result<TherapyProgram> {
    Ok(TherapyProgram {
      id:           self.id,
      child_id:     self.child_id,
      program_name: self.program_name,
      description:  self.description,
      start_date:   decode_opt_dt(self.start_date)?,
      end_date:     decode_opt_dt(self.end_date)?,
      status:       decode_enum::<ProgramStatus>("program status", &self.status)?,
      created_by:   self.created_by,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const SESSION_COLUMNS: &str =
  "id, child_id, program_id, therapist_id, tanggal_sesi, notes, created_by, created_at";

pub struct RawSession {
  pub id:           i64,
  pub child_id:     i64,
  pub program_id:   Option<i64>,
  pub therapist_id: Option<i64>,
  pub tanggal_sesi: String,
  pub notes:        Option<String>,
  pub created_by:   i64,
  pub created_at:   String,
}

impl RawSession {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      child_id:     row.get(1)?,
      program_id:   row.get(2)?,
      therapist_id: row.get(3)?,
      tanggal_sesi: row.get(4)?,
      notes:        row.get(5)?,
      created_by:   row.get(6)?,
      created_at:   row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<TherapySession> {
    Ok(TherapySession {
      id:           self.id,
      child_id:     self.child_id,
      program_id:   self.program_id,
      therapist_id: self.therapist_id,
      tanggal_sesi: decode_dt(&self.tanggal_sesi)?,
      notes:        self.notes,
      created_by:   self.created_by,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

pub const NOTIFICATION_COLUMNS: &str = "id, jenis_pemberitahuan, isi_notifikasi, tujuan, is_read, \
   created_by, created_at, updated_at";

pub struct RawNotification {
  pub id:          i64,
  pub kind:        String,
  pub body:        String,
  pub destination: String,
  pub is_read:     bool,
  pub created_by:  i64,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      kind:        row.get(1)?,
      body:        row.get(2)?,
      destination: row.get(3)?,
      is_read:     row.get(4)?,
      created_by:  row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:          self.id,
      kind:        decode_enum::<NotificationKind>("notification kind", &self.kind)?,
      body:        self.body,
      destination: self.destination,
      is_read:     self.is_read,
      created_by:  self.created_by,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

pub const CONVERSION_COLUMNS: &str = "id, bulan, tahun, jumlah_leads, jumlah_conversi, \
   jumlah_anak_keluar, created_by, updated_by, created_at, updated_at";

pub struct RawConversion {
  pub id:                 i64,
  pub bulan:              String,
  pub tahun:              i32,
  pub jumlah_leads:       i64,
  pub jumlah_conversi:    i64,
  pub jumlah_anak_keluar: i64,
  pub created_by:         i64,
  pub updated_by:         Option<i64>,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawConversion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      bulan:              row.get(1)?,
      tahun:              row.get(2)?,
      jumlah_leads:       row.get(3)?,
      jumlah_conversi:    row.get(4)?,
      jumlah_anak_keluar: row.get(5)?,
      created_by:         row.get(6)?,
      updated_by:         row.get(7)?,
      created_at:         row.get(8)?,
      updated_at:         row.get(9)?,
    })
  }

  pub fn into_conversion(self) -> Result<Conversion> {
    Ok(Conversion {
      id:                 self.id,
      bulan:              self.bulan,
      tahun:              self.tahun,
      jumlah_leads:       self.jumlah_leads,
      jumlah_conversi:    self.jumlah_conversi,
      jumlah_anak_keluar: self.jumlah_anak_keluar,
      created_by:         self.created_by,
      updated_by:         self.updated_by,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

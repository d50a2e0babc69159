//! Writes against the child record graph.
//!
//! Every function takes a plain `&Connection` so the same code runs on the
//! bare connection (create path), on a savepoint, or inside the update
//! transaction; both of the latter deref to a connection.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, types::Value as SqlValue};
use serde_json::{Map, Value};
use yamet_core::{
  child::NewChild,
  clinical::{AssessmentInput, ProgramInput},
  intake::{ATTACHMENT_SLOTS, Relation, RelationOutcome, SectionRejection, SectionWrite, merge, prepare},
  lifecycle::{IntakePath, default_assessment, default_program},
};

use crate::{encode::encode_dt, error::other};

type DbResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why one relation could not be written.
#[derive(Debug)]
pub enum ApplyError {
  Rejected(SectionRejection),
  Database(tokio_rusqlite::Error),
}

impl fmt::Display for ApplyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApplyError::Rejected(r) => write!(f, "{r}"),
      ApplyError::Database(e) => write!(f, "{e}"),
    }
  }
}

impl From<rusqlite::Error> for ApplyError {
  fn from(e: rusqlite::Error) -> Self { ApplyError::Database(e.into()) }
}

impl From<tokio_rusqlite::Error> for ApplyError {
  fn from(e: tokio_rusqlite::Error) -> Self { ApplyError::Database(e) }
}

/// Shown in the relation summary in place of database error text.
pub const SAVE_FAILED: &str = "Gagal menyimpan data";

/// Summary entry for one relation write. Validation text is passed through;
/// database failures are logged and reported generically.
pub fn outcome(relation: &str, result: Result<(), ApplyError>) -> RelationOutcome {
  match result {
    Ok(()) => RelationOutcome::success(relation),
    Err(ApplyError::Rejected(rejection)) => RelationOutcome::failed(relation, rejection.to_string()),
    Err(ApplyError::Database(e)) => {
      tracing::warn!(relation, error = %e, "relation write failed");
      RelationOutcome::failed(relation, SAVE_FAILED)
    }
  }
}

// ─── Children ────────────────────────────────────────────────────────────────

/// Insert the child row. A taken `nomor_anak` is replaced by the next free
/// number under the same `YAMET-{year}-` prefix.
pub fn insert_child(conn: &Connection, input: &NewChild, now: DateTime<Utc>) -> DbResult<i64> {
  let number = free_child_number(conn, &input.number)?;
  let f      = &input.fields;
  let now    = encode_dt(now);
  let status = f.status.unwrap_or_default();

  conn.execute(
    "INSERT INTO children (
       nomor_anak, full_name, nick_name, jenis_kelamin, birth_date, birth_place,
       kewarganegaraan, agama, anak_ke, sekolah_kelas, status, tanggal_pemeriksaan,
       mulai_terapi, selesai_terapi, mulai_cuti, created_by, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
    rusqlite::params![
      number,
      input.full_name,
      f.nick_name,
      f.gender.as_ref().map(AsRef::<str>::as_ref),
      f.birth_date.map(encode_dt),
      f.birth_place,
      f.nationality,
      f.religion,
      f.birth_order,
      f.school_grade,
      status.as_ref(),
      f.exam_date.map(encode_dt),
      f.therapy_start.map(encode_dt),
      f.therapy_end.map(encode_dt),
      f.leave_start.map(encode_dt),
      input.created_by,
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn free_child_number(conn: &Connection, candidate: &str) -> DbResult<String> {
  let taken: bool = conn
    .query_row(
      "SELECT 1 FROM children WHERE nomor_anak = ?1",
      rusqlite::params![candidate],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if !taken {
    return Ok(candidate.to_owned());
  }

  let prefix = match candidate.rsplit_once('-') {
    Some((prefix, _)) => prefix,
    None => candidate,
  };
  let mut stmt = conn.prepare("SELECT nomor_anak FROM children WHERE nomor_anak LIKE ?1")?;
  let highest = stmt
    .query_map(rusqlite::params![format!("{prefix}-%")], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .iter()
    .filter_map(|n| n.rsplit_once('-').and_then(|(_, tail)| tail.parse::<u32>().ok()))
    .max()
    .unwrap_or(0);
  Ok(format!("{prefix}-{:04}", highest + 1))
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// Validate one section payload and write it.
pub fn apply_relation(
  conn:     &Connection,
  child_id: i64,
  relation: Relation,
  payload:  &Value,
  now:      DateTime<Utc>,
) -> Result<(), ApplyError> {
  match prepare(relation, payload).map_err(ApplyError::Rejected)? {
    SectionWrite::Patch(patch) => {
      write_patch(conn, child_id, relation, patch, now)?;
    }
    SectionWrite::Rows(rows) => replace_rows(conn, child_id, relation, &rows)?,
  }
  Ok(())
}

fn parent_column(relation: Relation) -> &'static str {
  if relation == Relation::Father { "father_of" } else { "mother_of" }
}

/// The stored one-to-one section, or `None` if never written.
pub fn load_section(conn: &Connection, child_id: i64, relation: Relation) -> DbResult<Option<Map<String, Value>>> {
  let json: Option<String> = if relation.is_parent() {
    conn
      .query_row(
        &format!("SELECT data_json FROM parents WHERE {} = ?1", parent_column(relation)),
        rusqlite::params![child_id],
        |row| row.get(0),
      )
      .optional()?
  } else if relation == Relation::Attachments {
    return load_attachments(conn, child_id);
  } else {
    conn
      .query_row(
        "SELECT data_json FROM intake_sections WHERE child_id = ?1 AND relation = ?2",
        rusqlite::params![child_id, relation.name()],
        |row| row.get(0),
      )
      .optional()?
  };

  json
    .map(|s| match serde_json::from_str(&s).map_err(other)? {
      Value::Object(map) => Ok(map),
      _ => Err(other(crate::Error::MalformedSection(relation.name()))),
    })
    .transpose()
}

fn load_attachments(conn: &Connection, child_id: i64) -> DbResult<Option<Map<String, Value>>> {
  let sql = format!("SELECT {} FROM attachments WHERE child_id = ?1", ATTACHMENT_SLOTS.join(", "));
  Ok(
    conn
      .query_row(&sql, rusqlite::params![child_id], |row| {
        let mut map = Map::new();
        for (i, slot) in ATTACHMENT_SLOTS.iter().enumerate() {
          let v: Option<String> = row.get(i)?;
          map.insert((*slot).to_owned(), v.map_or(Value::Null, Value::String));
        }
        Ok(map)
      })
      .optional()?,
  )
}

/// Merge `patch` over the stored section, creating it if absent.
pub fn write_patch(
  conn:     &Connection,
  child_id: i64,
  relation: Relation,
  patch:    Map<String, Value>,
  now:      DateTime<Utc>,
) -> DbResult<Map<String, Value>> {
  let stored  = load_section(conn, child_id, relation)?;
  let exists  = stored.is_some();
  let section = merge(relation, stored, patch);
  let now     = encode_dt(now);

  if relation == Relation::Attachments {
    let slot = |name: &str| section.get(name).and_then(Value::as_str).map(str::to_owned);
    conn.execute(
      "INSERT INTO attachments (
         child_id, hasil_eeg_url, hasil_bera_url, hasil_ct_scan_url, program_terapi_3bln_url,
         hasil_psikologis_psikiatris_url, perjanjian, keterangan_tambahan, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
       ON CONFLICT (child_id) DO UPDATE SET
         hasil_eeg_url                   = excluded.hasil_eeg_url,
         hasil_bera_url                  = excluded.hasil_bera_url,
         hasil_ct_scan_url               = excluded.hasil_ct_scan_url,
         program_terapi_3bln_url         = excluded.program_terapi_3bln_url,
         hasil_psikologis_psikiatris_url = excluded.hasil_psikologis_psikiatris_url,
         perjanjian                      = excluded.perjanjian,
         keterangan_tambahan             = excluded.keterangan_tambahan,
         updated_at                      = excluded.updated_at",
      rusqlite::params![
        child_id,
        slot("hasil_eeg_url"),
        slot("hasil_bera_url"),
        slot("hasil_ct_scan_url"),
        slot("program_terapi_3bln_url"),
        slot("hasil_psikologis_psikiatris_url"),
        slot("perjanjian"),
        slot("keterangan_tambahan"),
        now,
      ],
    )?;
    return Ok(section);
  }

  let json = serde_json::to_string(&section).map_err(other)?;
  if relation.is_parent() {
    let column = parent_column(relation);
    if exists {
      conn.execute(
        &format!("UPDATE parents SET data_json = ?1, updated_at = ?2 WHERE {column} = ?3"),
        rusqlite::params![json, now, child_id],
      )?;
    } else {
      conn.execute(
        &format!("INSERT INTO parents ({column}, data_json, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)"),
        rusqlite::params![child_id, json, now],
      )?;
    }
  } else {
    conn.execute(
      "INSERT INTO intake_sections (child_id, relation, data_json, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?4)
       ON CONFLICT (child_id, relation) DO UPDATE SET
         data_json  = excluded.data_json,
         updated_at = excluded.updated_at",
      rusqlite::params![child_id, relation.name(), json, now],
    )?;
  }
  Ok(section)
}

fn collection_table(relation: Relation) -> (&'static str, &'static [&'static str]) {
  match relation {
    Relation::PriorExaminations => ("prior_examinations", &["tempat", "usia", "diagnosa"]),
    _ => ("prior_therapies", &["jenis_terapi", "frekuensi", "lama_terapi", "tempat"]),
  }
}

/// Replace a collection wholesale. An empty list just clears it.
fn replace_rows(
  conn:     &Connection,
  child_id: i64,
  relation: Relation,
  rows:     &[Map<String, Value>],
) -> DbResult<()> {
  let (table, columns) = collection_table(relation);
  conn.execute(
    &format!("DELETE FROM {table} WHERE child_id = ?1"),
    rusqlite::params![child_id],
  )?;
  if rows.is_empty() {
    return Ok(());
  }

  let placeholders: Vec<String> = (2..=columns.len() + 1).map(|i| format!("?{i}")).collect();
  let mut stmt = conn.prepare(&format!(
    "INSERT INTO {table} (child_id, {}) VALUES (?1, {})",
    columns.join(", "),
    placeholders.join(", "),
  ))?;
  for row in rows {
    let mut values: Vec<SqlValue> = Vec::with_capacity(columns.len() + 1);
    values.push(SqlValue::Integer(child_id));
    for column in columns {
      values.push(match row.get(*column).and_then(Value::as_str) {
        Some(s) => SqlValue::Text(s.to_owned()),
        None => SqlValue::Null,
      });
    }
    stmt.execute(rusqlite::params_from_iter(values))?;
  }
  Ok(())
}

/// Every section of the child keyed by relation name; absent sections are
/// `null` and empty collections are `[]`.
pub fn load_sections(conn: &Connection, child_id: i64) -> DbResult<Map<String, Value>> {
  let mut out = Map::new();
  for relation in Relation::all() {
    let value = if relation.is_collection() {
      Value::Array(load_rows(conn, child_id, relation)?.into_iter().map(Value::Object).collect())
    } else {
      load_section(conn, child_id, relation)?.map_or(Value::Null, Value::Object)
    };
    out.insert(relation.name().to_owned(), value);
  }
  Ok(out)
}

fn load_rows(conn: &Connection, child_id: i64, relation: Relation) -> DbResult<Vec<Map<String, Value>>> {
  let (table, columns) = collection_table(relation);
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM {table} WHERE child_id = ?1 ORDER BY id",
    columns.join(", "),
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![child_id], |row| {
      let mut map = Map::new();
      for (i, column) in columns.iter().enumerate() {
        let v: Option<String> = row.get(i)?;
        map.insert((*column).to_owned(), v.map_or(Value::Null, Value::String));
      }
      Ok(map)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Clinical defaults ───────────────────────────────────────────────────────

pub fn insert_assessment(
  conn:     &Connection,
  child_id: i64,
  input:    &AssessmentInput,
  actor:    i64,
  now:      DateTime<Utc>,
) -> DbResult<i64> {
  let now = encode_dt(now);
  conn.execute(
    "INSERT INTO assessments (
       child_id, assessment_date, assessment_type, assessment_result, notes,
       created_by, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    rusqlite::params![
      child_id,
      encode_dt(input.assessment_date),
      input.assessment_type,
      input.assessment_result,
      input.notes,
      actor,
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_program(
  conn:     &Connection,
  child_id: i64,
  input:    &ProgramInput,
  actor:    i64,
  now:      DateTime<Utc>,
) -> DbResult<i64> {
  let now = encode_dt(now);
  conn.execute(
    "INSERT INTO programs (
       child_id, program_name, description, start_date, end_date, status,
       created_by, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    rusqlite::params![
      child_id,
      input.program_name,
      input.description,
      input.start_date.map(encode_dt),
      input.end_date.map(encode_dt),
      input.status.as_ref(),
      actor,
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Who the defaults are written for.
pub struct DefaultsFor<'a> {
  pub child_id:  i64,
  pub name:      &'a str,
  pub exam_date: Option<DateTime<Utc>>,
  pub actor:     i64,
  pub path:      IntakePath,
}

fn has_any(conn: &Connection, table: &str, child_id: i64) -> DbResult<bool> {
  Ok(conn.query_row(
    &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE child_id = ?1)"),
    rusqlite::params![child_id],
    |row| row.get(0),
  )?)
}

/// Create the default assessment unless the child already has one.
pub fn ensure_assessment(conn: &Connection, who: &DefaultsFor<'_>, now: DateTime<Utc>) -> DbResult<()> {
  if !has_any(conn, "assessments", who.child_id)? {
    let input = default_assessment(who.name, who.exam_date, now, who.path);
    insert_assessment(conn, who.child_id, &input, who.actor, now)?;
  }
  Ok(())
}

/// Create the default therapy program unless the child already has one.
pub fn ensure_program(conn: &Connection, who: &DefaultsFor<'_>, now: DateTime<Utc>) -> DbResult<()> {
  if !has_any(conn, "programs", who.child_id)? {
    let input = default_program(who.name, who.exam_date, now, who.path);
    insert_program(conn, who.child_id, &input, who.actor, now)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use yamet_core::intake::FieldIssue;

  use super::*;

  #[test]
  fn database_errors_are_not_shown_to_clients() {
    let failed = outcome("pola_tidur", Err(rusqlite::Error::QueryReturnedNoRows.into()));
    assert!(!failed.is_success());
    assert_eq!(failed.error.as_deref(), Some(SAVE_FAILED));
  }

  #[test]
  fn rejections_keep_their_field_messages() {
    let rejection = SectionRejection {
      relation: Relation::Birth,
      issues:   vec![FieldIssue::new("jenis_kelahiran", "invalid_enum_value", "Invalid enum value")],
    };
    let failed = outcome("riwayat_kelahiran", Err(ApplyError::Rejected(rejection)));
    assert_eq!(failed.error.as_deref(), Some("jenis_kelahiran: Invalid enum value"));
  }
}

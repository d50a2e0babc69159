//! [`SqliteStore`], the SQLite implementation of [`Store`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use serde_json::{Map, Value};
use yamet_core::{
  child::{ChildFields, ChildQuery, ChildSort, NewChild},
  clinical::{Assessment, AssessmentInput, ProgramInput, SessionInput, TherapyProgram, TherapySession},
  conversion::{Conversion, ConversionInput, ConversionPatch, ConversionQuery},
  dashboard::{
    Activity, ChildFacts, DashboardSnapshot, FamilySetup, ImmunizationRecord, ParentProfile,
    PregnancyFlags, SurveyAnswers,
  },
  intake::{Relation, RelationOutcome},
  lifecycle::{IntakePath, resolve_leave},
  notification::{NewNotification, Notification, NotificationPatch, NotificationQuery},
  settings::AppConfig,
  store::{
    ChildDetail, ChildRecord, ConversionWrite, CreatedChild, Page, Store, UpdateOutcome, UserWrite,
    page_window, paginate,
  },
  user::{NewUser, Role, User, UserPatch, UserQuery, UserStatus},
};

use crate::{
  Error, Result,
  encode::{
    ASSESSMENT_COLUMNS, CHILD_COLUMNS, CONVERSION_COLUMNS, NOTIFICATION_COLUMNS, PROGRAM_COLUMNS,
    RawAssessment, RawChild, RawConversion, RawNotification, RawProgram, RawSession, RawUser,
    SESSION_COLUMNS, USER_COLUMNS, decode_dt, decode_enum, decode_opt_dt, encode_dt,
  },
  error::other,
  graph::{self, ApplyError, DefaultsFor},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A YAMET store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn live_child(&self, id: i64) -> Result<Option<RawChild>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1 AND deleted_at IS NULL"),
                rusqlite::params![id],
                RawChild::from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn assessment_by_id(&self, id: i64) -> Result<Option<Assessment>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1"),
              rusqlite::params![id],
              RawAssessment::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAssessment::into_assessment).transpose()
  }

  async fn program_by_id(&self, id: i64) -> Result<Option<TherapyProgram>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = ?1"),
              rusqlite::params![id],
              RawProgram::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProgram::into_program).transpose()
  }

  async fn conversion_by_id(&self, id: i64) -> Result<Option<Conversion>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONVERSION_COLUMNS} FROM conversions WHERE id = ?1"),
              rusqlite::params![id],
              RawConversion::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawConversion::into_conversion).transpose()
  }

  /// Write a conversion row unless another row holds the same month.
  async fn save_conversion(
    &self,
    id: Option<i64>,
    input: ConversionInput,
    actor: i64,
  ) -> Result<ConversionWrite> {
    let now = encode_dt(Utc::now());

    let saved: Option<i64> = self
      .conn
      .call(move |conn| {
        let clash: Option<i64> = conn
          .query_row(
            "SELECT id FROM conversions WHERE bulan = ?1 AND tahun = ?2",
            rusqlite::params![input.bulan, input.tahun],
            |row| row.get(0),
          )
          .optional()?;
        if clash.is_some_and(|other| Some(other) != id) {
          return Ok(None);
        }

        match id {
          Some(id) => {
            conn.execute(
              "UPDATE conversions SET
                 bulan = ?1, tahun = ?2, jumlah_leads = ?3, jumlah_conversi = ?4,
                 jumlah_anak_keluar = ?5, updated_by = ?6, updated_at = ?7
               WHERE id = ?8",
              rusqlite::params![
                input.bulan,
                input.tahun,
                input.jumlah_leads,
                input.jumlah_conversi,
                input.jumlah_anak_keluar,
                actor,
                now,
                id,
              ],
            )?;
            Ok(Some(id))
          }
          None => {
            conn.execute(
              "INSERT INTO conversions (
                 bulan, tahun, jumlah_leads, jumlah_conversi, jumlah_anak_keluar,
                 created_by, created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
              rusqlite::params![
                input.bulan,
                input.tahun,
                input.jumlah_leads,
                input.jumlah_conversi,
                input.jumlah_anak_keluar,
                actor,
                now,
              ],
            )?;
            Ok(Some(conn.last_insert_rowid()))
          }
        }
      })
      .await?;

    let Some(id) = saved else { return Ok(ConversionWrite::Duplicate) };
    Ok(match self.conversion_by_id(id).await? {
      Some(row) => ConversionWrite::Saved(row),
      None => ConversionWrite::NotFound,
    })
  }

  /// Every notification, optionally filtered by read state, newest first.
  async fn all_notifications(&self, is_read: Option<bool>) -> Result<Vec<Notification>> {
    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE (?1 IS NULL OR is_read = ?1)
           ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![is_read], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawNotification::into_notification).collect()
  }
}

// ─── Query building ──────────────────────────────────────────────────────────

/// A `WHERE` clause assembled from optional filters, with positional
/// parameters.
#[derive(Default)]
struct Filter {
  clauses: Vec<String>,
  params:  Vec<SqlValue>,
}

impl Filter {
  fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = SqlValue>) {
    self.clauses.push(clause.into());
    self.params.extend(params);
  }

  fn sql(&self) -> String {
    if self.clauses.is_empty() { String::new() } else { format!("WHERE {}", self.clauses.join(" AND ")) }
  }
}

/// `%term%`, lowercased, for a case-insensitive `LIKE`.
fn like(term: &str) -> SqlValue { SqlValue::Text(format!("%{}%", term.trim().to_lowercase())) }

fn text(s: impl Into<String>) -> SqlValue { SqlValue::Text(s.into()) }

/// Run a count query and a paged select sharing one filter.
fn paged<T>(
  conn: &rusqlite::Connection,
  from: &str,
  columns: &str,
  filter: &Filter,
  order: &str,
  limit: u32,
  offset: u64,
  map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<(Vec<T>, u64)> {
  let where_sql = filter.sql();
  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {from} {where_sql}"),
    rusqlite::params_from_iter(filter.params.iter()),
    |row| row.get(0),
  )?;

  let mut params = filter.params.clone();
  params.push(SqlValue::Integer(i64::from(limit)));
  params.push(SqlValue::Integer(offset as i64));
  let mut stmt = conn.prepare(&format!(
    "SELECT {columns} FROM {from} {where_sql} ORDER BY {order} LIMIT ? OFFSET ?"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params_from_iter(params.iter()), map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok((rows, total.max(0) as u64))
}

fn child_order(sort: ChildSort, descending: bool) -> String {
  let column = match sort {
    ChildSort::CreatedAt => "created_at",
    ChildSort::UpdatedAt => "updated_at",
    ChildSort::FullName => "full_name COLLATE NOCASE",
    ChildSort::Number => "nomor_anak",
    ChildSort::Id => "id",
  };
  let dir = if descending { "DESC" } else { "ASC" };
  format!("{column} {dir}, id {dir}")
}

/// A row read back right after its insert was not there.
fn vanished() -> Error { Error::Database(rusqlite::Error::QueryReturnedNoRows.into()) }

fn is_constraint(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Users and sessions ────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let now = encode_dt(Utc::now());

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (
             name, email, phone, role, status, password_hash, created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            input.name,
            input.email,
            input.phone,
            input.role.as_ref(),
            input.status.as_ref(),
            input.password_hash,
            input.created_by,
            now,
          ],
        );
        match inserted {
          Ok(_) => Ok(Some(conn.last_insert_rowid())),
          Err(e) if is_constraint(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match id {
      Some(id) => self.get_user(id).await,
      None => Ok(None),
    }
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_login(&self, identifier: &str) -> Result<Option<(User, String)>> {
    let identifier = identifier.trim().to_owned();

    let raw: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users
                 WHERE email = ?1 COLLATE NOCASE OR phone = ?1
                 LIMIT 1"
              ),
              rusqlite::params![identifier],
              |row| Ok((RawUser::from_row(row)?, row.get(9)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|(user, hash)| Ok((user.into_user()?, hash))).transpose()
  }

  async fn list_users(&self, query: &UserQuery) -> Result<Page<User>> {
    let (_, limit, offset) = page_window(query.page, query.limit);
    let mut filter = Filter::default();
    if let Some(term) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
      filter.push(
        "(LOWER(name) LIKE ? OR LOWER(COALESCE(email, '')) LIKE ?)",
        [like(term), like(term)],
      );
    }

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(paged(
          conn,
          "users",
          USER_COLUMNS,
          &filter,
          "created_at DESC, id DESC",
          limit,
          offset,
          RawUser::from_row,
        )?)
      })
      .await?;

    let items = raws.into_iter().map(RawUser::into_user).collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(role, n)| Ok((decode_enum::<Role>("role", &role)?, n.max(0) as u64)))
      .collect()
  }

  async fn update_user(&self, id: i64, patch: UserPatch) -> Result<UserWrite> {
    /// What the connection thread found, decoded afterwards.
    enum Written {
      Row(RawUser),
      Refused(UserWrite),
    }

    let now = encode_dt(Utc::now());
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row("SELECT 1 FROM users WHERE id = ?1", rusqlite::params![id], |_| Ok(()))
          .optional()?
          .is_some();
        if !exists {
          return Ok(Written::Refused(UserWrite::NotFound));
        }

        let taken = |column: &str, value: &Option<String>| -> rusqlite::Result<bool> {
          let Some(value) = value else { return Ok(false) };
          Ok(
            tx.query_row(
              &format!("SELECT 1 FROM users WHERE {column} = ?1 AND id != ?2"),
              rusqlite::params![value, id],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
          )
        };
        if taken("email", &patch.email)? {
          return Ok(Written::Refused(UserWrite::EmailTaken));
        }
        if taken("phone", &patch.phone)? {
          return Ok(Written::Refused(UserWrite::PhoneTaken));
        }

        tx.execute(
          "UPDATE users SET
             name          = COALESCE(?1, name),
             email         = COALESCE(?2, email),
             phone         = COALESCE(?3, phone),
             role          = COALESCE(?4, role),
             status        = COALESCE(?5, status),
             password_hash = COALESCE(?6, password_hash),
             updated_at    = ?7
           WHERE id = ?8",
          rusqlite::params![
            patch.name,
            patch.email,
            patch.phone,
            patch.role.as_ref().map(AsRef::<str>::as_ref),
            patch.status.as_ref().map(AsRef::<str>::as_ref),
            patch.password_hash,
            now,
            id,
          ],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
          rusqlite::params![id],
          RawUser::from_row,
        )?;
        tx.commit()?;
        Ok(Written::Row(raw))
      })
      .await?;

    match written {
      Written::Row(raw) => Ok(UserWrite::Updated(raw.into_user()?)),
      Written::Refused(refusal) => Ok(refusal),
    }
  }

  async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<bool> {
    let now = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET status = ?1, updated_at = ?2 WHERE id = ?3",
          rusqlite::params![status.as_ref(), now, id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn create_session(&self, user_id: i64, token_hash: String, expires_at: DateTime<Utc>) -> Result<()> {
    let now     = encode_dt(Utc::now());
    let expires = encode_dt(expires_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_hash, user_id, now, expires],
        )?;
        // Expired sessions are swept whenever a new one is issued.
        conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", rusqlite::params![now])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_user(&self, token_hash: String, now: DateTime<Utc>) -> Result<Option<User>> {
    let now = encode_dt(now);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.id, u.name, u.email, u.phone, u.role, u.status, u.created_by,
                      u.created_at, u.updated_at
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2",
              rusqlite::params![token_hash, now],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE token_hash = ?1", rusqlite::params![token_hash])?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Children ──────────────────────────────────────────────────────────────

  async fn create_child(
    &self,
    input: NewChild,
    sections: Vec<(Relation, Value)>,
    now: DateTime<Utc>,
  ) -> Result<CreatedChild> {
    let (raw, relations): (RawChild, Vec<RelationOutcome>) = self
      .conn
      .call(move |conn| {
        let id = graph::insert_child(conn, &input, now)?;

        let mut outcomes = Vec::with_capacity(sections.len() + 2);
        for (relation, payload) in sections {
          // Each relation gets its own savepoint so a half-written collection
          // never survives a failure.
          let sp = conn.savepoint()?;
          let applied = graph::apply_relation(&sp, id, relation, &payload, now);
          let result  = applied.and_then(|()| sp.commit().map_err(ApplyError::from));
          outcomes.push(graph::outcome(relation.name(), result));
        }

        let who = DefaultsFor {
          child_id:  id,
          name:      &input.full_name,
          exam_date: input.fields.exam_date,
          actor:     input.created_by,
          path:      IntakePath::Registration,
        };
        let assessment = graph::ensure_assessment(conn, &who, now).map_err(ApplyError::from);
        outcomes.push(graph::outcome("assessment_default", assessment));
        let program = graph::ensure_program(conn, &who, now).map_err(ApplyError::from);
        outcomes.push(graph::outcome("program_terapi_default", program));

        let raw = conn.query_row(
          &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1"),
          rusqlite::params![id],
          RawChild::from_row,
        )?;
        Ok((raw, outcomes))
      })
      .await?;

    Ok(CreatedChild { child: raw.into_child()?, relations })
  }

  async fn update_child(
    &self,
    id: i64,
    fields: ChildFields,
    sections: Vec<(Relation, Value)>,
    actor: i64,
    now: DateTime<Utc>,
  ) -> Result<UpdateOutcome> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let stored = tx
          .query_row(
            &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1 AND deleted_at IS NULL"),
            rusqlite::params![id],
            RawChild::from_row,
          )
          .optional()?;
        let Some(stored) = stored else { return Ok(UpdateOutcome::NotFound) };
        let mut child = stored.into_child().map_err(other)?;

        let stored_leave = child.leave_start.filter(|_| !fields.clears("mulai_cuti"));
        let leave = resolve_leave(fields.status, child.status, fields.leave_start, stored_leave, now);

        let ChildFields {
          full_name,
          nick_name,
          gender,
          birth_date,
          birth_place,
          nationality,
          religion,
          birth_order,
          school_grade,
          status: _,
          exam_date,
          therapy_start,
          therapy_end,
          leave_start: _,
          cleared,
        } = fields;
        let keep = |column: &str| !cleared.iter().any(|c| *c == column);
        if let Some(v) = full_name {
          child.full_name = v;
        }
        child.nick_name     = nick_name.or(child.nick_name.filter(|_| keep("nick_name")));
        child.gender        = gender.or(child.gender.filter(|_| keep("jenis_kelamin")));
        child.birth_date    = birth_date.or(child.birth_date.filter(|_| keep("birth_date")));
        child.birth_place   = birth_place.or(child.birth_place.filter(|_| keep("birth_place")));
        child.nationality   = nationality.or(child.nationality.filter(|_| keep("kewarganegaraan")));
        child.religion      = religion.or(child.religion.filter(|_| keep("agama")));
        child.birth_order   = birth_order.or(child.birth_order.filter(|_| keep("anak_ke")));
        child.school_grade  = school_grade.or(child.school_grade.filter(|_| keep("sekolah_kelas")));
        child.exam_date     = exam_date.or(child.exam_date.filter(|_| keep("tanggal_pemeriksaan")));
        child.therapy_start = therapy_start.or(child.therapy_start.filter(|_| keep("mulai_terapi")));
        child.therapy_end   = therapy_end.or(child.therapy_end.filter(|_| keep("selesai_terapi")));
        child.leave_start   = leave.leave_start;
        child.status        = leave.status;

        tx.execute(
          "UPDATE children SET
             full_name = ?1, nick_name = ?2, jenis_kelamin = ?3, birth_date = ?4,
             birth_place = ?5, kewarganegaraan = ?6, agama = ?7, anak_ke = ?8,
             sekolah_kelas = ?9, status = ?10, tanggal_pemeriksaan = ?11,
             mulai_terapi = ?12, selesai_terapi = ?13, mulai_cuti = ?14,
             updated_by = ?15, updated_at = ?16
           WHERE id = ?17",
          rusqlite::params![
            child.full_name,
            child.nick_name,
            child.gender.as_ref().map(AsRef::<str>::as_ref),
            child.birth_date.map(encode_dt),
            child.birth_place,
            child.nationality,
            child.religion,
            child.birth_order,
            child.school_grade,
            child.status.as_ref(),
            child.exam_date.map(encode_dt),
            child.therapy_start.map(encode_dt),
            child.therapy_end.map(encode_dt),
            child.leave_start.map(encode_dt),
            actor,
            encode_dt(now),
            id,
          ],
        )?;

        for (relation, payload) in sections {
          match graph::apply_relation(&tx, id, relation, &payload, now) {
            Ok(()) => {}
            // Dropping the transaction rolls every write back.
            Err(ApplyError::Rejected(rejection)) => return Ok(UpdateOutcome::Invalid(rejection)),
            Err(ApplyError::Database(e)) => return Err(e),
          }
        }

        let who = DefaultsFor {
          child_id:  id,
          name:      &child.full_name,
          exam_date: child.exam_date,
          actor,
          path:      IntakePath::Update,
        };
        graph::ensure_assessment(&tx, &who, now)?;
        graph::ensure_program(&tx, &who, now)?;
        tx.commit()?;

        let raw = conn.query_row(
          &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1"),
          rusqlite::params![id],
          RawChild::from_row,
        )?;
        Ok(UpdateOutcome::Updated(Box::new(raw.into_child().map_err(other)?)))
      })
      .await
      .map_err(Error::from)
  }

  async fn get_child(&self, id: i64) -> Result<Option<ChildDetail>> {
    let found = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1 AND deleted_at IS NULL"),
            rusqlite::params![id],
            RawChild::from_row,
          )
          .optional()?;
        let Some(raw) = raw else { return Ok(None) };

        let sections = graph::load_sections(conn, id)?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE child_id = ?1
           ORDER BY assessment_date DESC, id DESC LIMIT 5"
        ))?;
        let assessments = stmt
          .query_map(rusqlite::params![id], RawAssessment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {PROGRAM_COLUMNS} FROM programs WHERE child_id = ?1
           ORDER BY created_at DESC, id DESC LIMIT 5"
        ))?;
        let programs = stmt
          .query_map(rusqlite::params![id], RawProgram::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((raw, sections, assessments, programs)))
      })
      .await?;

    let Some((raw, sections, assessments, programs)) = found else { return Ok(None) };
    Ok(Some(ChildDetail {
      record:         ChildRecord { child: raw.into_child()?, sections },
      penilaian:      assessments
        .into_iter()
        .map(RawAssessment::into_assessment)
        .collect::<Result<_>>()?,
      program_terapi: programs.into_iter().map(RawProgram::into_program).collect::<Result<_>>()?,
    }))
  }

  async fn list_children(&self, query: &ChildQuery) -> Result<Page<ChildRecord>> {
    let (_, limit, offset) = page_window(query.page, query.limit);
    let order = child_order(query.sort, query.descending);

    let mut filter = Filter::default();
    filter.push("deleted_at IS NULL", []);
    if let Some(term) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
      filter.push(
        "(LOWER(full_name) LIKE ? OR LOWER(COALESCE(nick_name, '')) LIKE ? OR LOWER(nomor_anak) LIKE ?)",
        [like(term), like(term), like(term)],
      );
    }
    if let Some(status) = query.status {
      filter.push("status = ?", [text(status.as_ref())]);
    }
    if let Some(after) = query.created_after {
      filter.push("created_at >= ?", [text(encode_dt(after))]);
    }
    if let Some(before) = query.created_before {
      filter.push("created_at <= ?", [text(encode_dt(before))]);
    }

    let (rows, total) = self
      .conn
      .call(move |conn| {
        let (raws, total) = paged(conn, "children", CHILD_COLUMNS, &filter, &order, limit, offset, RawChild::from_row)?;
        let mut rows = Vec::with_capacity(raws.len());
        for raw in raws {
          let sections = graph::load_sections(conn, raw.id)?;
          rows.push((raw, sections));
        }
        Ok((rows, total))
      })
      .await?;

    let items = rows
      .into_iter()
      .map(|(raw, sections)| Ok(ChildRecord { child: raw.into_child()?, sections }))
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn soft_delete_child(&self, id: i64, actor: i64, now: DateTime<Utc>) -> Result<bool> {
    let now = encode_dt(now);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE children SET deleted_at = ?1, deleted_by = ?2, updated_at = ?1
           WHERE id = ?3 AND deleted_at IS NULL",
          rusqlite::params![now, actor, id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn child_exists(&self, id: i64) -> Result<bool> { Ok(self.live_child(id).await?.is_some()) }

  // ── Clinical records ──────────────────────────────────────────────────────

  async fn list_assessments(&self, child_id: i64, page: u32, limit: u32) -> Result<Page<Assessment>> {
    let (_, limit, offset) = page_window(page, limit);
    let mut filter = Filter::default();
    filter.push("child_id = ?", [SqlValue::Integer(child_id)]);

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(paged(
          conn,
          "assessments",
          ASSESSMENT_COLUMNS,
          &filter,
          "assessment_date DESC, id DESC",
          limit,
          offset,
          RawAssessment::from_row,
        )?)
      })
      .await?;

    let items = raws.into_iter().map(RawAssessment::into_assessment).collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn create_assessment(&self, child_id: i64, input: AssessmentInput, actor: i64) -> Result<Assessment> {
    let now = Utc::now();
    let id = self
      .conn
      .call(move |conn| graph::insert_assessment(conn, child_id, &input, actor, now))
      .await?;
    self
      .assessment_by_id(id)
      .await?
      .ok_or_else(vanished)
  }

  async fn update_assessment(&self, child_id: i64, id: i64, input: AssessmentInput) -> Result<Option<Assessment>> {
    let now = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE assessments SET
             assessment_date = ?1, assessment_type = ?2, assessment_result = ?3, notes = ?4,
             updated_at = ?5
           WHERE id = ?6 AND child_id = ?7",
          rusqlite::params![
            encode_dt(input.assessment_date),
            input.assessment_type,
            input.assessment_result,
            input.notes,
            now,
            id,
            child_id,
          ],
        )?)
      })
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.assessment_by_id(id).await
  }

  async fn delete_assessment(&self, child_id: i64, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM assessments WHERE id = ?1 AND child_id = ?2",
          rusqlite::params![id, child_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_programs(&self, child_id: i64, page: u32, limit: u32) -> Result<Page<TherapyProgram>> {
    let (_, limit, offset) = page_window(page, limit);
    let mut filter = Filter::default();
    filter.push("child_id = ?", [SqlValue::Integer(child_id)]);

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(paged(
          conn,
          "programs",
          PROGRAM_COLUMNS,
          &filter,
          "created_at DESC, id DESC",
          limit,
          offset,
          RawProgram::from_row,
        )?)
      })
      .await?;

    let items = raws.into_iter().map(RawProgram::into_program).collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn create_program(&self, child_id: i64, input: ProgramInput, actor: i64) -> Result<TherapyProgram> {
    let now = Utc::now();
    let id = self
      .conn
      .call(move |conn| graph::insert_program(conn, child_id, &input, actor, now))
      .await?;
    self
      .program_by_id(id)
      .await?
      .ok_or_else(vanished)
  }

  async fn update_program(&self, child_id: i64, id: i64, input: ProgramInput) -> Result<Option<TherapyProgram>> {
    let now = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE programs SET
             program_name = ?1, description = ?2, start_date = ?3, end_date = ?4, status = ?5,
             updated_at = ?6
           WHERE id = ?7 AND child_id = ?8",
          rusqlite::params![
            input.program_name,
            input.description,
            input.start_date.map(encode_dt),
            input.end_date.map(encode_dt),
            input.status.as_ref(),
            now,
            id,
            child_id,
          ],
        )?)
      })
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.program_by_id(id).await
  }

  async fn delete_program(&self, child_id: i64, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM programs WHERE id = ?1 AND child_id = ?2",
          rusqlite::params![id, child_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_sessions(&self, child_id: i64, page: u32, limit: u32) -> Result<Page<TherapySession>> {
    let (_, limit, offset) = page_window(page, limit);
    let mut filter = Filter::default();
    filter.push("child_id = ?", [SqlValue::Integer(child_id)]);

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(paged(
          conn,
          "therapy_sessions",
          SESSION_COLUMNS,
          &filter,
          "tanggal_sesi DESC, id DESC",
          limit,
          offset,
          RawSession::from_row,
        )?)
      })
      .await?;

    let items = raws.into_iter().map(RawSession::into_session).collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn record_session(&self, child_id: i64, input: SessionInput, actor: i64) -> Result<Option<TherapySession>> {
    let now = encode_dt(Utc::now());
    let raw = self
      .conn
      .call(move |conn| {
        if let Some(program_id) = input.program_id {
          let owned: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM programs WHERE id = ?1 AND child_id = ?2)",
            rusqlite::params![program_id, child_id],
            |row| row.get(0),
          )?;
          if !owned {
            return Ok(None);
          }
        }
        if let Some(therapist_id) = input.therapist_id {
          let known: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = ?1)",
            rusqlite::params![therapist_id],
            |row| row.get(0),
          )?;
          if !known {
            return Ok(None);
          }
        }

        conn.execute(
          "INSERT INTO therapy_sessions (
             child_id, program_id, therapist_id, tanggal_sesi, notes, created_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            child_id,
            input.program_id,
            input.therapist_id,
            encode_dt(input.tanggal_sesi),
            input.notes,
            actor,
            now,
          ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Some(conn.query_row(
          &format!("SELECT {SESSION_COLUMNS} FROM therapy_sessions WHERE id = ?1"),
          rusqlite::params![id],
          RawSession::from_row,
        )?))
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn attachments(&self, child_id: i64) -> Result<Option<Map<String, Value>>> {
    Ok(
      self
        .conn
        .call(move |conn| graph::load_section(conn, child_id, Relation::Attachments))
        .await?,
    )
  }

  async fn store_attachments(&self, child_id: i64, patch: Map<String, Value>) -> Result<Map<String, Value>> {
    let now = Utc::now();
    Ok(
      self
        .conn
        .call(move |conn| graph::write_patch(conn, child_id, Relation::Attachments, patch, now))
        .await?,
    )
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn list_notifications(&self, query: &NotificationQuery) -> Result<Page<Notification>> {
    let (_, limit, offset) = page_window(query.page, query.limit);
    let mut filter = Filter::default();
    if let Some(term) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
      filter.push(
        "(LOWER(isi_notifikasi) LIKE ? OR LOWER(jenis_pemberitahuan) LIKE ?)",
        [like(term), like(term)],
      );
    }
    if let Some(kind) = query.kind {
      filter.push("jenis_pemberitahuan = ?", [text(kind.as_ref())]);
    }
    if let Some(is_read) = query.is_read {
      filter.push("is_read = ?", [SqlValue::Integer(i64::from(is_read))]);
    }
    if let Some(dest) = query.destination.as_deref().filter(|s| !s.trim().is_empty()) {
      filter.push("LOWER(tujuan) LIKE ?", [like(dest)]);
    }

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(paged(
          conn,
          "notifications",
          NOTIFICATION_COLUMNS,
          &filter,
          "created_at DESC, id DESC",
          limit,
          offset,
          RawNotification::from_row,
        )?)
      })
      .await?;

    let items = raws.into_iter().map(RawNotification::into_notification).collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn get_notification(&self, id: i64) -> Result<Option<Notification>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
              rusqlite::params![id],
              RawNotification::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawNotification::into_notification).transpose()
  }

  async fn create_notification(&self, input: NewNotification) -> Result<Notification> {
    let now = encode_dt(Utc::now());
    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             jenis_pemberitahuan, isi_notifikasi, tujuan, is_read, created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
          rusqlite::params![input.kind.as_ref(), input.body, input.destination, input.created_by, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
          rusqlite::params![id],
          RawNotification::from_row,
        )?)
      })
      .await?;
    raw.into_notification()
  }

  async fn update_notification(&self, id: i64, patch: NotificationPatch) -> Result<Option<Notification>> {
    let Some(current) = self.get_notification(id).await? else { return Ok(None) };

    let kind        = patch.kind.unwrap_or(current.kind);
    let body        = patch.body.unwrap_or(current.body);
    let destination = patch.destination.unwrap_or(current.destination);
    let is_read     = patch.is_read.unwrap_or(current.is_read);
    let now         = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE notifications SET
             jenis_pemberitahuan = ?1, isi_notifikasi = ?2, tujuan = ?3, is_read = ?4, updated_at = ?5
           WHERE id = ?6",
          rusqlite::params![kind.as_ref(), body, destination, is_read, now, id],
        )?;
        Ok(())
      })
      .await?;
    self.get_notification(id).await
  }

  async fn delete_notification(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM notifications WHERE id = ?1", rusqlite::params![id])?))
      .await?;
    Ok(changed > 0)
  }

  async fn notifications_for(
    &self,
    user: &User,
    is_read: Option<bool>,
    page: u32,
    limit: u32,
  ) -> Result<Page<Notification>> {
    // Destinations are free text, so addressing is decided in Rust.
    let mine: Vec<Notification> = self
      .all_notifications(is_read)
      .await?
      .into_iter()
      .filter(|n| n.addressed_to(user))
      .collect();
    Ok(paginate(mine, page, limit))
  }

  async fn mark_read(&self, user: &User, id: i64) -> Result<Option<Notification>> {
    let Some(current) = self.get_notification(id).await? else { return Ok(None) };
    if !current.addressed_to(user) {
      return Ok(None);
    }
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE notifications SET is_read = 1, updated_at = ?1 WHERE id = ?2",
          rusqlite::params![now, id],
        )?;
        Ok(())
      })
      .await?;
    self.get_notification(id).await
  }

  // ── Conversions ───────────────────────────────────────────────────────────

  async fn list_conversions(&self, query: &ConversionQuery) -> Result<Page<Conversion>> {
    let (_, limit, offset) = page_window(query.page, query.limit);
    let mut filter = Filter::default();
    if let Some(term) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
      filter.push("LOWER(bulan) LIKE ?", [like(term)]);
    }
    if let Some(bulan) = query.bulan.as_deref().filter(|s| !s.trim().is_empty()) {
      filter.push("bulan = ? COLLATE NOCASE", [text(bulan.trim())]);
    }
    if let Some(tahun) = query.tahun {
      filter.push("tahun = ?", [SqlValue::Integer(i64::from(tahun))]);
    }

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(paged(
          conn,
          "conversions",
          CONVERSION_COLUMNS,
          &filter,
          "created_at DESC, id DESC",
          limit,
          offset,
          RawConversion::from_row,
        )?)
      })
      .await?;

    let items = raws.into_iter().map(RawConversion::into_conversion).collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn create_conversion(&self, input: ConversionInput, actor: i64) -> Result<ConversionWrite> {
    self.save_conversion(None, input, actor).await
  }

  async fn update_conversion(&self, id: i64, patch: ConversionPatch, actor: i64) -> Result<ConversionWrite> {
    let Some(current) = self.conversion_by_id(id).await? else { return Ok(ConversionWrite::NotFound) };
    self.save_conversion(Some(id), patch.apply(&current), actor).await
  }

  async fn delete_conversion(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM conversions WHERE id = ?1", rusqlite::params![id])?))
      .await?;
    Ok(changed > 0)
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn app_config(&self) -> Result<Option<AppConfig>> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(
            conn
              .query_row(
                "SELECT app_name, logo_url, color_schema FROM app_config WHERE id = 1",
                [],
                |row| {
                  Ok(AppConfig {
                    app_name:     row.get(0)?,
                    logo_url:     row.get(1)?,
                    color_schema: row.get(2)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn put_app_config(&self, config: AppConfig) -> Result<AppConfig> {
    let saved = config.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO app_config (id, app_name, logo_url, color_schema) VALUES (1, ?1, ?2, ?3)
           ON CONFLICT (id) DO UPDATE SET
             app_name     = excluded.app_name,
             logo_url     = excluded.logo_url,
             color_schema = excluded.color_schema",
          rusqlite::params![config.app_name, config.logo_url, config.color_schema],
        )?;
        Ok(())
      })
      .await?;
    Ok(saved)
  }

  // ── Analytics ─────────────────────────────────────────────────────────────

  async fn dashboard_snapshot(&self) -> Result<DashboardSnapshot> {
    let raw: RawSnapshot = self.conn.call(read_snapshot).await?;
    raw.decode()
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Columns and section JSON read for the dashboard, decoded outside the
/// connection thread.
struct RawSnapshot {
  children:    Vec<RawChild>,
  /// `(child_id, relation) -> data_json` for the sections the dashboard reads.
  sections:    HashMap<(i64, String), String>,
  /// `(child_id, is_father) -> data_json`.
  parents:     HashMap<(i64, bool), String>,
  therapies:   HashMap<i64, i64>,
  assessments: Vec<(String, i64)>,
  programs:    Vec<(Option<String>, i64)>,
  sessions:    Vec<(String, i64)>,
  users:       Vec<RawUser>,
  conversions: Vec<RawConversion>,
}

const SNAPSHOT_SECTIONS: [Relation; 4] =
  [Relation::Survey, Relation::Pregnancy, Relation::Immunization, Relation::Family];

fn read_snapshot(conn: &mut rusqlite::Connection) -> std::result::Result<RawSnapshot, tokio_rusqlite::Error> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CHILD_COLUMNS} FROM children WHERE deleted_at IS NULL ORDER BY created_at, id"
  ))?;
  let children = stmt
    .query_map([], RawChild::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let names: Vec<String> = SNAPSHOT_SECTIONS.iter().map(|r| format!("'{}'", r.name())).collect();
  let mut stmt = conn.prepare(&format!(
    "SELECT child_id, relation, data_json FROM intake_sections WHERE relation IN ({})",
    names.join(", ")
  ))?;
  let sections: HashMap<(i64, String), String> = stmt
    .query_map([], |row| Ok(((row.get(0)?, row.get(1)?), row.get(2)?)))?
    .collect::<rusqlite::Result<HashMap<_, _>>>()?;

  let mut stmt = conn.prepare("SELECT father_of, mother_of, data_json FROM parents")?;
  let parents: HashMap<(i64, bool), String> = stmt
    .query_map([], |row| {
      let father: Option<i64> = row.get(0)?;
      let mother: Option<i64> = row.get(1)?;
      let key = match (father, mother) {
        (Some(id), _) => (id, true),
        (None, id) => (id.unwrap_or_default(), false),
      };
      Ok((key, row.get(2)?))
    })?
    .collect::<rusqlite::Result<HashMap<_, _>>>()?;

  let mut stmt = conn.prepare("SELECT child_id, COUNT(*) FROM prior_therapies GROUP BY child_id")?;
  let therapies: HashMap<i64, i64> = stmt
    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<HashMap<_, _>>>()?;

  let dated = |conn: &rusqlite::Connection, sql: &str| -> rusqlite::Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  };
  let assessments = dated(
    conn,
    "SELECT a.assessment_date, a.created_by FROM assessments a
     JOIN children c ON c.id = a.child_id WHERE c.deleted_at IS NULL",
  )?;
  let sessions = dated(
    conn,
    "SELECT s.tanggal_sesi, s.created_by FROM therapy_sessions s
     JOIN children c ON c.id = s.child_id WHERE c.deleted_at IS NULL",
  )?;

  let mut stmt = conn.prepare(
    "SELECT p.start_date, p.created_by FROM programs p
     JOIN children c ON c.id = p.child_id WHERE c.deleted_at IS NULL",
  )?;
  let programs: Vec<(Option<String>, i64)> = stmt
    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
  let users = stmt
    .query_map([], RawUser::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {CONVERSION_COLUMNS} FROM conversions ORDER BY created_at DESC, id DESC"
  ))?;
  let conversions = stmt
    .query_map([], RawConversion::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(RawSnapshot {
    children,
    sections,
    parents,
    therapies,
    assessments,
    programs,
    sessions,
    users,
    conversions,
  })
}

impl RawSnapshot {
  fn section<T: serde::de::DeserializeOwned>(&self, child_id: i64, relation: Relation) -> Result<Option<T>> {
    self
      .sections
      .get(&(child_id, relation.name().to_owned()))
      .map(|json| serde_json::from_str(json).map_err(Error::from))
      .transpose()
  }

  fn parent(&self, child_id: i64, father: bool) -> Result<Option<ParentProfile>> {
    self
      .parents
      .get(&(child_id, father))
      .map(|json| serde_json::from_str(json).map_err(Error::from))
      .transpose()
  }

  fn decode(self) -> Result<DashboardSnapshot> {
    let mut children = Vec::with_capacity(self.children.len());
    for raw in &self.children {
      let id = raw.id;
      children.push(ChildFacts {
        id,
        status: decode_enum("child status", &raw.status)?,
        gender: raw.gender.as_deref().map(|g| decode_enum("gender", g)).transpose()?,
        birth_date: decode_opt_dt(raw.birth_date.clone())?,
        birth_place: raw.birth_place.clone(),
        exam_date: decode_opt_dt(raw.exam_date.clone())?,
        therapy_start: decode_opt_dt(raw.therapy_start.clone())?,
        therapy_end: decode_opt_dt(raw.therapy_end.clone())?,
        created_at: decode_dt(&raw.created_at)?,
        created_by: raw.created_by,
        survey: self.section::<SurveyAnswers>(id, Relation::Survey)?,
        pregnancy: self.section::<PregnancyFlags>(id, Relation::Pregnancy)?,
        immunization: self.section::<ImmunizationRecord>(id, Relation::Immunization)?,
        family: self.section::<FamilySetup>(id, Relation::Family)?,
        father: self.parent(id, true)?,
        mother: self.parent(id, false)?,
        prior_therapy_count: self.therapies.get(&id).copied().unwrap_or(0).max(0) as u64,
      });
    }

    let activity = |(at, by): (String, i64)| -> Result<Activity> {
      Ok(Activity { at: Some(decode_dt(&at)?), created_by: by })
    };

    Ok(DashboardSnapshot {
      children,
      assessments: self.assessments.into_iter().map(activity).collect::<Result<_>>()?,
      programs:    self
        .programs
        .into_iter()
        .map(|(at, by)| Ok(Activity { at: decode_opt_dt(at)?, created_by: by }))
        .collect::<Result<_>>()?,
      sessions:    self.sessions.into_iter().map(activity).collect::<Result<_>>()?,
      users:       self.users.into_iter().map(RawUser::into_user).collect::<Result<_>>()?,
      conversions: self
        .conversions
        .into_iter()
        .map(RawConversion::into_conversion)
        .collect::<Result<_>>()?,
    })
  }
}

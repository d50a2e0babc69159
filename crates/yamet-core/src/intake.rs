//! The intake form: top-level child fields plus the nested sections captured
//! at registration.
//!
//! Each nested section is described by a field table rather than a dedicated
//! struct. The table drives validation (kind checks, enum membership, dates),
//! strips keys the form does not know, and applies the per-section clean-ups
//! the form has always needed. Validated sections are stored as JSON objects
//! and merged key-by-key on later writes.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use strum::{EnumIter, IntoEnumIterator as _};

use crate::child::{ChildFields, ChildStatus, Gender, NULLABLE_COLUMNS, parse_date};

// ─── Field issues ────────────────────────────────────────────────────────────

/// One validation failure, addressed by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
  pub field:   String,
  pub message: String,
  pub code:    &'static str,
}

impl FieldIssue {
  pub fn new(field: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into(), code }
  }

  fn invalid_type(field: impl Into<String>, expected: &str, received: &Value) -> Self {
    Self::new(
      field,
      "invalid_type",
      format!("Expected {expected}, received {}", json_kind(received)),
    )
  }
}

fn json_kind(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ─── Field tables ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Number,
  Bool,
  TextList,
  /// A date string; empty strings are stored as null.
  Date,
  OneOf(&'static [&'static str]),
}

pub type Field = (&'static str, FieldKind);

use FieldKind::{Bool as B, Date as D, Number as N, Text as T, TextList as L};

const SURVEY: &[Field] = &[
  ("mengetahui_yamet_dari", T),
  ("penjelasan_mekanisme", B),
  ("bersedia_online", B),
  ("keluhan_orang_tua", L),
  ("tindakan_orang_tua", L),
  ("kendala", L),
];

const PARENT: &[Field] = &[
  ("nama", T),
  ("tempat_lahir", T),
  ("tanggal_lahir", D),
  ("usia", N),
  ("agama", T),
  ("alamat_rumah", T),
  ("anak_ke", N),
  ("pernikahan_ke", N),
  ("usia_saat_menikah", N),
  ("pendidikan_terakhir", T),
  ("pekerjaan_saat_ini", T),
  ("telepon", T),
  ("email", T),
  ("tahun_meninggal", N),
  ("usia_saat_meninggal", N),
  ("kewarganegaraan", T),
];

/// Pregnancy flags that count towards the dashboard risk score.
pub const RISK_FLAGS: &[&str] = &[
  "diabetes",
  "hipertensi",
  "asma",
  "tbc",
  "merokok",
  "konsumsi_alkohol",
  "infeksi_virus",
  "kecelakaan_trauma",
];

const PREGNANCY: &[Field] = &[
  ("usia_ibu_saat_hamil", N),
  ("usia_ayah_saat_hamil", N),
  ("mual_sulit_makan", B),
  ("asupan_gizi_memadai", B),
  ("perawatan_kehamilan", B),
  ("kehamilan_diinginkan", B),
  ("berat_bayi_semester_normal", B),
  ("diabetes", B),
  ("hipertensi", B),
  ("asma", B),
  ("tbc", B),
  ("merokok", B),
  ("sekitar_perokok_berat", B),
  ("konsumsi_alkohol", B),
  ("konsumsi_obat_obatan", B),
  ("infeksi_virus", B),
  ("kecelakaan_trauma", B),
  ("pendarahan_flek", B),
  ("masalah_pernafasan", B),
];

const BIRTH: &[Field] = &[
  ("jenis_kelahiran", FieldKind::OneOf(&["NORMAL", "CAESAR", "Normal"])),
  ("alasan_sc", T),
  ("bantuan_kelahiran", L),
  ("is_premature", B),
  ("usia_kelahiran_bulan", N),
  ("posisi_bayi_saat_lahir", FieldKind::OneOf(&["KEPALA", "KAKI", "Normal"])),
  ("is_sungsang", B),
  ("is_kuning", B),
  ("detak_jantung_anak", T),
  ("apgar_score", T),
  ("lama_persalinan", T),
  (
    "penolong_persalinan",
    FieldKind::OneOf(&["DOKTER", "BIDAN", "DUKUN_BAYI", "Dokter_Spesialis", "Dokter Spesialis"]),
  ),
  ("tempat_bersalin", T),
  ("cerita_spesifik_kelahiran", T),
  ("berat_badan_bayi", N),
  ("panjang_badan_bayi", N),
];

/// Core vaccines whose absence counts as an immunization gap.
pub const CORE_VACCINES: &[&str] = &[
  "bgc", "polio_1", "polio_2", "polio_3", "polio_4", "dpt_1", "dpt_2", "dpt_3", "campak_1",
];

const IMMUNIZATION: &[Field] = &[
  ("bgc", B),
  ("hep_b1", B),
  ("hep_b2", B),
  ("hep_b3", B),
  ("dpt_1", B),
  ("dpt_2", B),
  ("dpt_3", B),
  ("dpt_booster_1", B),
  ("polio_1", B),
  ("polio_2", B),
  ("polio_3", B),
  ("polio_4", B),
  ("polio_booster_1", B),
  ("campak_1", B),
  ("campak_2", B),
  ("hib_1", B),
  ("hib_2", B),
  ("hib_3", B),
  ("hib_4", B),
  ("mmr_1", B),
];

const POST_BIRTH: &[Field] = &[
  ("asi_sampai_usia_bulan", N),
  ("pernah_jatuh", B),
  ("jatuh_usia_bulan", N),
  ("jatuh_ketinggian_cm", N),
  ("pernah_sakit_parah", B),
  ("sakit_parah_usia_bulan", N),
  ("pernah_panas_tinggi", B),
  ("panas_tinggi_usia_bulan", N),
  ("disertai_kejang", B),
  ("frekuensi_durasi_kejang", T),
  ("pernah_kejang_tanpa_panas", B),
  ("kejang_tanpa_panas_usia_bulan", N),
  ("frekuensi_durasi_kejang_tanpa_panas", T),
  ("sakit_karena_virus", B),
  ("sakit_virus_usia_bulan", N),
  ("sakit_virus_jenis", T),
];

// Milestones come in `<name>_ya` / `<name>_usia` pairs.
const DEVELOPMENT: &[Field] = &[
  ("tengkurap_ya", B),
  ("tengkurap_usia", T),
  ("berguling_ya", B),
  ("berguling_usia", T),
  ("duduk_ya", B),
  ("duduk_usia", T),
  ("merayap_ya", B),
  ("merayap_usia", T),
  ("merangkak_ya", B),
  ("merangkak_usia", T),
  ("jongkok_ya", B),
  ("jongkok_usia", T),
  ("transisi_berdiri_ya", B),
  ("transisi_berdiri_usia", T),
  ("berdiri_tanpa_pegangan_ya", B),
  ("berdiri_tanpa_pegangan_usia", T),
  ("berjalan_tanpa_pegangan_ya", B),
  ("berjalan_tanpa_pegangan_usia", T),
  ("berlari_ya", B),
  ("berlari_usia", T),
  ("melompat_ya", B),
  ("melompat_usia", T),
  ("reflek_vokalisasi_ya", B),
  ("reflek_vokalisasi_usia", T),
  ("bubbling_ya", B),
  ("bubbling_usia", T),
  ("lalling_ya", B),
  ("lalling_usia", T),
  ("echolalia_ya", B),
  ("echolalia_usia", T),
  ("true_speech_ya", B),
  ("true_speech_usia", T),
  ("mengucapkan_1_kata_ya", B),
  ("mengucapkan_1_kata_usia", T),
  ("ungkap_keinginan_2_kata_ya", B),
  ("ungkap_keinginan_2_kata_usia", T),
  ("bercerita_ya", B),
  ("bercerita_usia", T),
  ("tertarik_lingkungan_luar_ya", B),
  ("tertarik_lingkungan_luar_usia", T),
  ("digendong_siapapun_ya", B),
  ("digendong_siapapun_usia", T),
  ("interaksi_timbal_balik_ya", B),
  ("interaksi_timbal_balik_usia", T),
  ("komunikasi_ekspresi_ibu_ya", B),
  ("komunikasi_ekspresi_ibu_usia", T),
  ("ekspresi_emosi_ya", B),
  ("ekspresi_emosi_usia", T),
];

const ORAL_MOTOR: &[Field] = &[
  ("mengeces", B),
  ("makan_makanan_keras", B),
  ("makan_makanan_berkuah", B),
  ("pilih_pilih_makanan", B),
  ("makan_di_emut", B),
  ("mengunyah_saat_makan", B),
  ("makan_langsung_telan", B),
];

const EATING: &[Field] = &[
  ("pola_teratur", T),
  ("ada_pantangan_makanan", B),
  ("pantangan_makanan", T),
  ("keterangan_lainnya", T),
];

const SOCIAL: &[Field] = &[
  ("perilaku_bertemu_orang_baru", T),
  ("perilaku_bertemu_teman_sebaya", T),
  ("perilaku_bertemu_orang_lebih_muda", T),
  ("perilaku_bertemu_orang_lebih_tua", T),
  ("bermain_dengan_banyak_anak", T),
  ("keterangan_lainnya", T),
];

const SLEEP: &[Field] = &[
  ("jam_tidur_teratur", B),
  ("sering_terbangun", B),
  ("jam_tidur_malam", T),
  ("jam_bangun_pagi", T),
];

const ILLNESS: &[Field] = &[
  ("sakit_telinga", B),
  ("sakit_telinga_usia_tahun", N),
  ("sakit_telinga_penjelasan", T),
  ("sakit_mata", B),
  ("sakit_mata_usia_tahun", N),
  ("sakit_mata_penjelasan", T),
  ("luka_kepala", B),
  ("luka_kepala_usia_tahun", N),
  ("penyakit_lainnya", T),
];

const FAMILY: &[Field] = &[
  ("tinggal_dengan", L),
  ("tinggal_dengan_lainnya", T),
  ("hubungan_ayah_ibu", T),
  ("hubungan_ayah_anak", T),
  ("hubungan_ibu_anak", T),
  ("hubungan_saudara_dengan_anak", T),
  ("hubungan_nenek_kakek_dengan_anak", T),
  ("hubungan_saudara_ortu_dengan_anak", T),
  ("hubungan_pengasuh_dengan_anak", T),
];

const EDUCATION: &[Field] = &[
  ("mulai_sekolah_formal_usia", T),
  ("mulai_sekolah_informal_usia", T),
  ("sekolah_formal_diikuti", T),
  ("sekolah_informal_diikuti", T),
  ("bimbingan_belajar", B),
  ("belajar_membaca_sendiri", B),
  ("belajar_dibacakan_ortu", B),
  ("nilai_rata_rata_sekolah", T),
  ("nilai_tertinggi_mapel", T),
  ("nilai_tertinggi_nilai", T),
  ("nilai_terendah_mapel", T),
  ("nilai_terendah_nilai", T),
  ("keluhan_guru", L),
];

const PRIOR_EXAMINATION: &[Field] = &[("tempat", T), ("usia", T), ("diagnosa", T)];

const PRIOR_THERAPY: &[Field] = &[
  ("jenis_terapi", T),
  ("frekuensi", T),
  ("lama_terapi", T),
  ("tempat", T),
];

/// Attachment slots. Upload and intake share these keys.
pub const ATTACHMENT_SLOTS: &[&str] = &[
  "hasil_eeg_url",
  "hasil_bera_url",
  "hasil_ct_scan_url",
  "program_terapi_3bln_url",
  "hasil_psikologis_psikiatris_url",
  "perjanjian",
  "keterangan_tambahan",
];

const ATTACHMENTS: &[Field] = &[
  ("hasil_eeg_url", T),
  ("hasil_bera_url", T),
  ("hasil_ct_scan_url", T),
  ("program_terapi_3bln_url", T),
  ("hasil_psikologis_psikiatris_url", T),
  ("perjanjian", T),
  ("keterangan_tambahan", T),
];

// ─── Relations ───────────────────────────────────────────────────────────────

/// A nested section of the intake form.
///
/// Declaration order is the order in which sections are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Relation {
  Survey,
  Father,
  Mother,
  Pregnancy,
  Birth,
  Immunization,
  PostBirth,
  Development,
  OralMotor,
  Eating,
  Social,
  Sleep,
  Illness,
  Family,
  Education,
  PriorExaminations,
  PriorTherapies,
  Attachments,
}

impl Relation {
  /// Every relation in write order.
  pub fn all() -> impl Iterator<Item = Relation> { Relation::iter() }

  pub fn name(self) -> &'static str {
    match self {
      Relation::Survey => "survey_awal",
      Relation::Father => "ayah",
      Relation::Mother => "ibu",
      Relation::Pregnancy => "riwayat_kehamilan",
      Relation::Birth => "riwayat_kelahiran",
      Relation::Immunization => "riwayat_imunisasi",
      Relation::PostBirth => "riwayat_setelah_lahir",
      Relation::Development => "perkembangan_anak",
      Relation::OralMotor => "perilaku_oral_motor",
      Relation::Eating => "pola_makan",
      Relation::Social => "perkembangan_sosial",
      Relation::Sleep => "pola_tidur",
      Relation::Illness => "penyakit_diderita",
      Relation::Family => "hubungan_keluarga",
      Relation::Education => "riwayat_pendidikan",
      Relation::PriorExaminations => "pemeriksaan_sebelumnya",
      Relation::PriorTherapies => "terapi_sebelumnya",
      Relation::Attachments => "lampiran",
    }
  }

  pub fn fields(self) -> &'static [Field] {
    match self {
      Relation::Survey => SURVEY,
      Relation::Father | Relation::Mother => PARENT,
      Relation::Pregnancy => PREGNANCY,
      Relation::Birth => BIRTH,
      Relation::Immunization => IMMUNIZATION,
      Relation::PostBirth => POST_BIRTH,
      Relation::Development => DEVELOPMENT,
      Relation::OralMotor => ORAL_MOTOR,
      Relation::Eating => EATING,
      Relation::Social => SOCIAL,
      Relation::Sleep => SLEEP,
      Relation::Illness => ILLNESS,
      Relation::Family => FAMILY,
      Relation::Education => EDUCATION,
      Relation::PriorExaminations => PRIOR_EXAMINATION,
      Relation::PriorTherapies => PRIOR_THERAPY,
      Relation::Attachments => ATTACHMENTS,
    }
  }

  /// One-to-many sections are replaced wholesale on every write.
  pub fn is_collection(self) -> bool {
    matches!(self, Relation::PriorExaminations | Relation::PriorTherapies)
  }

  pub fn is_parent(self) -> bool { matches!(self, Relation::Father | Relation::Mother) }

  /// The key set a section starts from before its first patch is merged.
  /// Text lists start empty; everything else starts null.
  pub fn blank(self) -> Map<String, Value> {
    self
      .fields()
      .iter()
      .map(|(name, kind)| {
        let v = match kind {
          FieldKind::TextList => Value::Array(Vec::new()),
          _ => Value::Null,
        };
        ((*name).to_owned(), v)
      })
      .collect()
  }
}

impl fmt::Display for Relation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// A section whose payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRejection {
  pub relation: Relation,
  pub issues:   Vec<FieldIssue>,
}

impl fmt::Display for SectionRejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self
      .issues
      .iter()
      .map(|i| format!("{}: {}", i.field, i.message))
      .collect();
    f.write_str(&parts.join("; "))
  }
}

// ─── Section payloads ────────────────────────────────────────────────────────

/// A validated write for one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionWrite {
  /// Keys to merge into the stored one-to-one section.
  Patch(Map<String, Value>),
  /// Rows replacing the stored collection.
  Rows(Vec<Map<String, Value>>),
}

/// Pick the nested sections out of an intake body, in write order.
///
/// Absent and null sections are skipped. A section whose container has the
/// wrong JSON kind is a structural error and is reported up front; the
/// section contents are only checked later by [`prepare`].
pub fn extract_sections(body: &Map<String, Value>) -> Result<Vec<(Relation, Value)>, Vec<FieldIssue>> {
  let mut out    = Vec::new();
  let mut issues = Vec::new();

  for relation in Relation::iter() {
    let Some(value) = body.get(relation.name()) else { continue };
    match (value, relation.is_collection()) {
      (Value::Null, _) => {}
      (Value::Array(_), true) | (Value::Object(_), false) => {
        out.push((relation, value.clone()));
      }
      (other, true) => issues.push(FieldIssue::invalid_type(relation.name(), "array", other)),
      (other, false) => issues.push(FieldIssue::invalid_type(relation.name(), "object", other)),
    }
  }

  if issues.is_empty() { Ok(out) } else { Err(issues) }
}

/// Validate and clean one section payload.
pub fn prepare(relation: Relation, payload: &Value) -> Result<SectionWrite, SectionRejection> {
  let reject = |issues| SectionRejection { relation, issues };

  if relation.is_collection() {
    let Value::Array(items) = payload else {
      return Err(reject(vec![FieldIssue::invalid_type(relation.name(), "array", payload)]));
    };
    let mut rows   = Vec::with_capacity(items.len());
    let mut issues = Vec::new();
    for (i, item) in items.iter().enumerate() {
      let path = format!("{}.{i}", relation.name());
      match prepare_object(relation, &path, item) {
        Ok(row) => rows.push(row),
        Err(mut found) => issues.append(&mut found),
      }
    }
    return if issues.is_empty() { Ok(SectionWrite::Rows(rows)) } else { Err(reject(issues)) };
  }

  prepare_object(relation, relation.name(), payload)
    .map(SectionWrite::Patch)
    .map_err(reject)
}

fn prepare_object(
  relation: Relation,
  path:     &str,
  payload:  &Value,
) -> Result<Map<String, Value>, Vec<FieldIssue>> {
  let Value::Object(obj) = payload else {
    return Err(vec![FieldIssue::invalid_type(path, "object", payload)]);
  };

  let mut out    = Map::new();
  let mut issues = Vec::new();

  for (name, kind) in relation.fields() {
    let Some(value) = obj.get(*name) else { continue };
    let field = format!("{path}.{name}");
    match check_field(&field, *kind, value) {
      Ok(v) => {
        out.insert((*name).to_owned(), v);
      }
      Err(issue) => issues.push(issue),
    }
  }

  if !issues.is_empty() {
    return Err(issues);
  }

  tidy(relation, &mut out);
  Ok(out)
}

fn check_field(field: &str, kind: FieldKind, value: &Value) -> Result<Value, FieldIssue> {
  if value.is_null() {
    return Ok(Value::Null);
  }
  match (kind, value) {
    (FieldKind::Text, Value::String(_))
    | (FieldKind::Number, Value::Number(_))
    | (FieldKind::Bool, Value::Bool(_)) => Ok(value.clone()),
    (FieldKind::TextList, Value::Array(items)) => {
      for (i, item) in items.iter().enumerate() {
        if !item.is_string() {
          return Err(FieldIssue::invalid_type(format!("{field}.{i}"), "string", item));
        }
      }
      Ok(value.clone())
    }
    (FieldKind::Date, Value::String(s)) => match parse_date(s) {
      Ok(None) => Ok(Value::Null),
      Ok(Some(_)) => Ok(value.clone()),
      Err(_) => Err(FieldIssue::new(field, "invalid_date", "Invalid date")),
    },
    (FieldKind::OneOf(options), Value::String(s)) => {
      if options.contains(&s.as_str()) {
        Ok(value.clone())
      } else {
        Err(invalid_enum(field, options, s))
      }
    }
    (FieldKind::Text | FieldKind::Date | FieldKind::OneOf(_), other) => {
      Err(FieldIssue::invalid_type(field, "string", other))
    }
    (FieldKind::Number, other) => Err(FieldIssue::invalid_type(field, "number", other)),
    (FieldKind::Bool, other) => Err(FieldIssue::invalid_type(field, "boolean", other)),
    (FieldKind::TextList, other) => Err(FieldIssue::invalid_type(field, "array", other)),
  }
}

fn invalid_enum(field: &str, options: &[&str], received: &str) -> FieldIssue {
  let expected: Vec<String> = options.iter().map(|o| format!("'{o}'")).collect();
  FieldIssue::new(
    field,
    "invalid_enum_value",
    format!(
      "Invalid enum value. Expected {}, received '{received}'",
      expected.join(" | ")
    ),
  )
}

/// Per-section clean-ups applied after validation.
fn tidy(relation: Relation, section: &mut Map<String, Value>) {
  if relation.is_parent() {
    for key in ["tahun_meninggal", "usia_saat_meninggal"] {
      if let Some(v) = section.get_mut(key)
        && !v.as_f64().is_some_and(|n| n > 0.0)
      {
        *v = Value::Null;
      }
    }
  }
  if relation == Relation::Birth
    && let Some(Value::String(s)) = section.get_mut("penolong_persalinan")
  {
    *s = s.replace(' ', "_");
  }
}

/// Merge a validated patch over the stored section. Keys in the patch win;
/// keys it does not mention keep their stored value.
pub fn merge(relation: Relation, stored: Option<Map<String, Value>>, patch: Map<String, Value>) -> Map<String, Value> {
  let mut section = stored.unwrap_or_else(|| relation.blank());
  for (k, v) in patch {
    section.insert(k, v);
  }
  section
}

// ─── Top-level fields ────────────────────────────────────────────────────────

/// Whether the body is a fresh registration or a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
  Create,
  Update,
}

/// Validate the child's own columns.
pub fn child_fields(body: &Map<String, Value>, mode: IntakeMode) -> Result<ChildFields, Vec<FieldIssue>> {
  let mut issues = Vec::new();
  let mut fields = ChildFields::default();

  match body.get("full_name") {
    Some(Value::String(name)) => {
      let len = name.chars().count();
      if len < 2 {
        issues.push(FieldIssue::new(
          "full_name",
          "too_small",
          "String must contain at least 2 character(s)",
        ));
      } else if len > 100 {
        issues.push(FieldIssue::new(
          "full_name",
          "too_big",
          "String must contain at most 100 character(s)",
        ));
      } else {
        fields.full_name = Some(name.clone());
      }
    }
    Some(Value::Null) | None if mode == IntakeMode::Update => {}
    None => issues.push(FieldIssue::new("full_name", "invalid_type", "Required")),
    Some(other) => issues.push(FieldIssue::invalid_type("full_name", "string", other)),
  }

  fields.nick_name    = text(body, "nick_name", &mut issues);
  fields.birth_place  = text(body, "birth_place", &mut issues);
  fields.nationality  = text(body, "kewarganegaraan", &mut issues);
  fields.religion     = text(body, "agama", &mut issues);
  fields.school_grade = text(body, "sekolah_kelas", &mut issues);

  fields.birth_date    = date(body, "birth_date", &mut issues);
  fields.exam_date     = date(body, "tanggal_pemeriksaan", &mut issues);
  fields.therapy_start = date(body, "mulai_terapi", &mut issues);
  fields.therapy_end   = date(body, "selesai_terapi", &mut issues);
  fields.leave_start   = date(body, "mulai_cuti", &mut issues);

  match body.get("anak_ke") {
    None | Some(Value::Null) => {}
    Some(Value::Number(n)) => match n.as_i64() {
      Some(i) => fields.birth_order = Some(i),
      None => issues.push(FieldIssue::new("anak_ke", "invalid_type", "Expected integer, received float")),
    },
    Some(other) => issues.push(FieldIssue::invalid_type("anak_ke", "number", other)),
  }

  fields.gender = enum_field::<Gender>(body, "jenis_kelamin", &["LAKI_LAKI", "PEREMPUAN"], &mut issues);
  fields.status = enum_field::<ChildStatus>(
    body,
    "status",
    &["AKTIF", "CUTI", "LULUS", "BERHENTI"],
    &mut issues,
  );
  if mode == IntakeMode::Create && fields.status.is_none() {
    fields.status = Some(ChildStatus::Active);
  }
  if mode == IntakeMode::Update {
    fields.cleared = NULLABLE_COLUMNS
      .into_iter()
      .filter(|key| matches!(body.get(*key), Some(Value::Null)))
      .collect();
  }

  if issues.is_empty() { Ok(fields) } else { Err(issues) }
}

fn text(body: &Map<String, Value>, key: &str, issues: &mut Vec<FieldIssue>) -> Option<String> {
  match body.get(key) {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => Some(s.clone()),
    Some(other) => {
      issues.push(FieldIssue::invalid_type(key, "string", other));
      None
    }
  }
}

fn date(
  body:   &Map<String, Value>,
  key:    &str,
  issues: &mut Vec<FieldIssue>,
) -> Option<chrono::DateTime<chrono::Utc>> {
  match body.get(key) {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => match parse_date(s) {
      Ok(d) => d,
      Err(_) => {
        issues.push(FieldIssue::new(key, "invalid_date", "Invalid date"));
        None
      }
    },
    Some(other) => {
      issues.push(FieldIssue::invalid_type(key, "string", other));
      None
    }
  }
}

fn enum_field<E: std::str::FromStr>(
  body:    &Map<String, Value>,
  key:     &str,
  options: &[&str],
  issues:  &mut Vec<FieldIssue>,
) -> Option<E> {
  match body.get(key) {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => match s.parse() {
      Ok(v) => Some(v),
      Err(_) => {
        issues.push(invalid_enum(key, options, s));
        None
      }
    },
    Some(other) => {
      issues.push(FieldIssue::invalid_type(key, "string", other));
      None
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
  Success,
  Failed,
}

/// One line of the relation summary returned by the create path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationOutcome {
  #[serde(rename = "relasi")]
  pub relation: String,
  pub status:   OutcomeStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:    Option<String>,
}

impl RelationOutcome {
  pub fn success(relation: impl Into<String>) -> Self {
    Self { relation: relation.into(), status: OutcomeStatus::Success, error: None }
  }

  pub fn failed(relation: impl Into<String>, error: impl Into<String>) -> Self {
    Self {
      relation: relation.into(),
      status:   OutcomeStatus::Failed,
      error:    Some(error.into()),
    }
  }

  pub fn is_success(&self) -> bool { self.status == OutcomeStatus::Success }
}

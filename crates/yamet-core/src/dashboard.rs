//! Dashboard aggregation.
//!
//! The store hands over a [`DashboardSnapshot`] of every live child and its
//! satellites; everything here is pure computation over that snapshot. Some
//! insight blocks honour the requested [`Window`] and some are always computed
//! over all time. Each block says which through `time_filter_applied`.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike as _, Utc};
use serde::{Deserialize, Serialize, ser::SerializeMap as _};

use crate::{
  child::{ChildStatus, Gender},
  conversion::{Conversion, conversion_rate},
  normalize::{MappingKind, MappingSnapshot, NormalizedItem, counts_from_labels, format_top, normalize, rank},
  user::{Role, User},
  window::{GrowthPoint, Window, month_bounds},
};

// ─── Section views ───────────────────────────────────────────────────────────

/// The parts of the intake survey the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurveyAnswers {
  pub mengetahui_yamet_dari: Option<String>,
  pub bersedia_online:       Option<bool>,
  pub keluhan_orang_tua:     Option<Vec<String>>,
  pub kendala:               Option<Vec<String>>,
  pub tindakan_orang_tua:    Option<Vec<String>>,
}

impl SurveyAnswers {
  pub fn complaints(&self) -> &[String] { self.keluhan_orang_tua.as_deref().unwrap_or_default() }

  pub fn obstacles(&self) -> &[String] { self.kendala.as_deref().unwrap_or_default() }

  pub fn parent_actions(&self) -> &[String] { self.tindakan_orang_tua.as_deref().unwrap_or_default() }
}

/// Pregnancy risk flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PregnancyFlags {
  pub diabetes:          Option<bool>,
  pub hipertensi:        Option<bool>,
  pub asma:              Option<bool>,
  pub tbc:               Option<bool>,
  pub merokok:           Option<bool>,
  pub konsumsi_alkohol:  Option<bool>,
  pub infeksi_virus:     Option<bool>,
  pub kecelakaan_trauma: Option<bool>,
}

impl PregnancyFlags {
  pub fn risk_count(&self) -> usize {
    [
      self.diabetes,
      self.hipertensi,
      self.asma,
      self.tbc,
      self.merokok,
      self.konsumsi_alkohol,
      self.infeksi_virus,
      self.kecelakaan_trauma,
    ]
    .into_iter()
    .filter(|f| *f == Some(true))
    .count()
  }
}

/// The core vaccines of an immunization record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImmunizationRecord {
  pub bgc:      Option<bool>,
  pub polio_1:  Option<bool>,
  pub polio_2:  Option<bool>,
  pub polio_3:  Option<bool>,
  pub polio_4:  Option<bool>,
  pub dpt_1:    Option<bool>,
  pub dpt_2:    Option<bool>,
  pub dpt_3:    Option<bool>,
  pub campak_1: Option<bool>,
}

impl ImmunizationRecord {
  /// Any core vaccine not recorded as given.
  pub fn has_gap(&self) -> bool {
    [
      self.bgc,
      self.polio_1,
      self.polio_2,
      self.polio_3,
      self.polio_4,
      self.dpt_1,
      self.dpt_2,
      self.dpt_3,
      self.campak_1,
    ]
    .into_iter()
    .any(|v| v != Some(true))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FamilySetup {
  pub tinggal_dengan: Option<Vec<String>>,
}

impl FamilySetup {
  pub fn is_nuclear(&self) -> bool {
    self.tinggal_dengan.as_deref().unwrap_or_default().iter().any(|t| t == "Keluarga inti")
  }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParentProfile {
  pub pendidikan_terakhir: Option<String>,
  pub pekerjaan_saat_ini:  Option<String>,
  pub alamat_rumah:        Option<String>,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A live child with the satellite sections the dashboard reads.
#[derive(Debug, Clone)]
pub struct ChildFacts {
  pub id:                  i64,
  pub status:              ChildStatus,
  pub gender:              Option<Gender>,
  pub birth_date:          Option<DateTime<Utc>>,
  pub birth_place:         Option<String>,
  pub exam_date:           Option<DateTime<Utc>>,
  pub therapy_start:       Option<DateTime<Utc>>,
  pub therapy_end:         Option<DateTime<Utc>>,
  pub created_at:          DateTime<Utc>,
  pub created_by:          i64,
  pub survey:              Option<SurveyAnswers>,
  pub pregnancy:           Option<PregnancyFlags>,
  pub immunization:        Option<ImmunizationRecord>,
  pub family:              Option<FamilySetup>,
  pub father:              Option<ParentProfile>,
  pub mother:              Option<ParentProfile>,
  pub prior_therapy_count: u64,
}

impl ChildFacts {
  pub(crate) fn parents(&self) -> impl Iterator<Item = &ParentProfile> { self.father.iter().chain(self.mother.iter()) }
}

/// A dated record attributed to its creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
  pub at:         Option<DateTime<Utc>>,
  pub created_by: i64,
}

/// Everything the aggregations need, read in one go. Only live children and
/// records belonging to live children are included.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
  pub children:    Vec<ChildFacts>,
  /// Dated by `assessment_date`.
  pub assessments: Vec<Activity>,
  /// Dated by `start_date`.
  pub programs:    Vec<Activity>,
  /// Dated by `tanggal_sesi`.
  pub sessions:    Vec<Activity>,
  pub users:       Vec<User>,
  /// Newest first.
  pub conversions: Vec<Conversion>,
}

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplaintCount {
  pub keluhan: String,
  pub count:   u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgeDistribution {
  #[serde(rename = "<2")]
  pub under_2:  u64,
  #[serde(rename = "2-4")]
  pub from_2:   u64,
  #[serde(rename = "4-6")]
  pub from_4:   u64,
  #[serde(rename = ">6")]
  pub over_6:   u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
  pub total_records:     u64,
  pub total_leads:       i64,
  pub total_anak_keluar: i64,
  pub total_conversi:    i64,
  pub conversion_rate:   f64,
  pub data:              Vec<Conversion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputDetail {
  pub anak:           u64,
  pub penilaian:      u64,
  pub program_terapi: u64,
  pub sesi_terapi:    u64,
}

/// One row of the admin input leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminInput {
  pub admin_id:    i64,
  pub admin_name:  String,
  pub admin_email: Option<String>,
  pub total_input: u64,
  pub detail:      InputDetail,
}

/// All-time insight block.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
  pub top_keluhan:                Vec<ComplaintCount>,
  pub age_distribution:           AgeDistribution,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub referral_source:            Option<BTreeMap<String, u64>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub therapy_success_count:      Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avg_therapy_duration_month: Option<f64>,
  pub time_filter_applied:        bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FamilyStructure {
  pub inti:     u64,
  pub extended: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssessmentConversion {
  pub total_assessment: u64,
  pub total_program:    u64,
  pub rate:             f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsultationPreference {
  pub online:  u64,
  pub offline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
  pub bulan: String,
  pub count: u64,
}

/// Insight block restricted to the requested window.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicalInsight {
  pub risk_factor_count:       u64,
  pub early_warning_count:     u64,
  pub imunisasi_kurang:        u64,
  pub family_structure:        FamilyStructure,
  pub parent_education:        BTreeMap<String, u64>,
  pub birth_place:             BTreeMap<String, u64>,
  pub assessment_conversion:   AssessmentConversion,
  pub prior_therapy_count:     u64,
  pub consultation_preference: ConsultationPreference,
  pub sessions_per_month:      Vec<MonthCount>,
  pub time_filter_applied:     bool,
}

/// One normalized domain: raw tallies, folded buckets and display text.
#[derive(Debug, Clone)]
pub struct NormalizedBlock {
  pub kind:       MappingKind,
  pub raw:        Vec<(String, u64)>,
  pub normalized: Vec<NormalizedItem>,
  pub formatted:  String,
}

impl NormalizedBlock {
  pub fn build(kind: MappingKind, tables: &MappingSnapshot, raw: Vec<(String, u64)>, max_items: usize) -> Self {
    let normalized = normalize(tables.table(kind), &raw);
    let formatted  = format_top(&normalized, max_items);
    Self { kind, raw, normalized, formatted }
  }
}

// The wire keys carry the domain name (`keluhan` / `sumber`).
impl Serialize for NormalizedBlock {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let name = self.kind.as_ref();

    struct RawRow<'a> {
      name:  &'a str,
      label: &'a str,
      count: u64,
    }
    impl Serialize for RawRow<'_> {
      fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.name, self.label)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
      }
    }

    let raw: Vec<RawRow<'_>> = self
      .raw
      .iter()
      .map(|(label, count)| RawRow { name, label, count: *count })
      .collect();

    let mut summary = BTreeMap::new();
    summary.insert(format!("total_unique_{name}"), serde_json::json!(self.raw.len()));
    summary.insert(format!("total_normalized_{name}"), serde_json::json!(self.normalized.len()));
    summary.insert(format!("top_{name}"), serde_json::to_value(self.normalized.first()).map_err(serde::ser::Error::custom)?);

    let mut map = serializer.serialize_map(Some(4))?;
    map.serialize_entry("raw_data", &raw)?;
    map.serialize_entry("normalized_data", &self.normalized)?;
    map.serialize_entry("formatted", &self.formatted)?;
    map.serialize_entry("summary", &summary)?;
    map.end()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizedData {
  pub keluhan:          NormalizedBlock,
  pub sumber_informasi: NormalizedBlock,
}

/// The `/dashboard/stats` payload. Optional fields are dropped by
/// [`DashboardStats::shaped_for`] depending on the caller's role.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
  pub total_anak:             u64,
  pub anak_keluar_bulan_lalu: u64,
  pub anak_keluar_bulan_ini:  u64,
  pub anak_aktif:             u64,
  pub conversion_data:        ConversionSummary,
  pub growth:                 Vec<GrowthPoint>,
  pub period:                 String,
  pub filter_applied:         String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_admin:            Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_terapis:          Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_manajer:          Option<u64>,
  pub total_orangtua:         u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub admin_input_stats:      Option<Vec<AdminInput>>,
  pub insight:                Insight,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub clinical_insight:       Option<ClinicalInsight>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub normalized_data:        Option<NormalizedData>,
}

impl DashboardStats {
  /// Drop the parts of the payload `role` does not see.
  pub fn shaped_for(mut self, role: Role) -> Self {
    match role {
      Role::SuperAdmin => {}
      Role::Manager => {
        self.total_manajer = None;
        self.insight.avg_therapy_duration_month = None;
      }
      Role::Admin => {
        self.total_admin = None;
        self.total_manajer = None;
        self.admin_input_stats = None;
        self.insight.avg_therapy_duration_month = None;
      }
      _ => {
        self.total_admin = None;
        self.total_terapis = None;
        self.total_manajer = None;
        self.admin_input_stats = None;
        self.insight.referral_source = None;
        self.insight.therapy_success_count = None;
        self.insight.avg_therapy_duration_month = None;
        self.clinical_insight = None;
        self.normalized_data = None;
      }
    }
    self
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

fn in_window(at: Option<DateTime<Utc>>, start: Option<DateTime<Utc>>) -> bool {
  match start {
    None => true,
    Some(start) => at.is_some_and(|d| d >= start),
  }
}

/// Count trimmed, non-empty labels in first-seen order, keeping their case.
pub(crate) fn tally<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<(String, u64)> {
  let mut out: Vec<(String, u64)> = Vec::new();
  for label in labels.into_iter().map(str::trim).filter(|l| !l.is_empty()) {
    match out.iter_mut().find(|(l, _)| l == label) {
      Some((_, c)) => *c += 1,
      None => out.push((label.to_owned(), 1)),
    }
  }
  out
}

pub(crate) fn year_age(birth: DateTime<Utc>, now: DateTime<Utc>) -> i32 { now.year() - birth.year() }

fn age_distribution(children: &[ChildFacts], now: DateTime<Utc>) -> AgeDistribution {
  let mut dist = AgeDistribution::default();
  for age in children.iter().filter_map(|c| c.birth_date).map(|b| year_age(b, now)) {
    match age {
      a if a < 2 => dist.under_2 += 1,
      a if a < 4 => dist.from_2 += 1,
      a if a < 6 => dist.from_4 += 1,
      _ => dist.over_6 += 1,
    }
  }
  dist
}

fn left_within(child: &ChildFacts, bounds: (DateTime<Utc>, DateTime<Utc>)) -> bool {
  child.status.has_left()
    && child.therapy_end.is_some_and(|end| end >= bounds.0 && end < bounds.1)
}

fn active_users(users: &[User], role: Role) -> u64 {
  users.iter().filter(|u| u.role == role && u.is_active()).count() as u64
}

fn percentage(part: u64, whole: u64) -> f64 {
  if whole == 0 {
    return 0.0;
  }
  (part as f64 / whole as f64 * 100.0 * 100.0).round() / 100.0
}

fn admin_leaderboard(snapshot: &DashboardSnapshot) -> Vec<AdminInput> {
  let by = |items: &[Activity], id: i64| items.iter().filter(|a| a.created_by == id).count() as u64;

  let mut rows: Vec<AdminInput> = snapshot
    .users
    .iter()
    .filter(|u| u.role == Role::Admin && u.is_active())
    .map(|admin| {
      let detail = InputDetail {
        anak:           snapshot.children.iter().filter(|c| c.created_by == admin.id).count() as u64,
        penilaian:      by(&snapshot.assessments, admin.id),
        program_terapi: by(&snapshot.programs, admin.id),
        sesi_terapi:    by(&snapshot.sessions, admin.id),
      };
      AdminInput {
        admin_id:    admin.id,
        admin_name:  admin.name.clone(),
        admin_email: admin.email.clone(),
        total_input: detail.anak + detail.penilaian + detail.program_terapi + detail.sesi_terapi,
        detail,
      }
    })
    .collect();
  rows.sort_by(|a, b| b.total_input.cmp(&a.total_input));
  rows
}

fn conversion_summary(conversions: &[Conversion]) -> ConversionSummary {
  let total_leads: i64 = conversions.iter().map(|c| c.jumlah_leads).sum();
  let total_conversi: i64 = conversions.iter().map(|c| c.jumlah_conversi).sum();
  ConversionSummary {
    total_records: conversions.len() as u64,
    total_leads,
    total_anak_keluar: conversions.iter().map(|c| c.jumlah_anak_keluar).sum(),
    total_conversi,
    conversion_rate: conversion_rate(total_leads, total_conversi),
    data: conversions.to_vec(),
  }
}

fn clinical_insight(snapshot: &DashboardSnapshot, start: Option<DateTime<Utc>>) -> ClinicalInsight {
  let children: Vec<&ChildFacts> = snapshot.children.iter().filter(|c| in_window(c.exam_date, start)).collect();

  let risks: Vec<usize> = children.iter().filter_map(|c| c.pregnancy.as_ref()).map(PregnancyFlags::risk_count).collect();

  let mut family = FamilyStructure::default();
  for setup in children.iter().filter_map(|c| c.family.as_ref()) {
    if setup.is_nuclear() {
      family.inti += 1;
    } else {
      family.extended += 1;
    }
  }

  let mut consultation = ConsultationPreference::default();
  for online in children.iter().filter_map(|c| c.survey.as_ref()).filter_map(|s| s.bersedia_online) {
    if online {
      consultation.online += 1;
    } else {
      consultation.offline += 1;
    }
  }

  let education = tally(
    children
      .iter()
      .flat_map(|c| c.parents())
      .filter_map(|p| p.pendidikan_terakhir.as_deref()),
  );
  let birth_place = tally(children.iter().filter_map(|c| c.birth_place.as_deref()));

  let total_assessment = snapshot.assessments.iter().filter(|a| in_window(a.at, start)).count() as u64;
  let total_program    = snapshot.programs.iter().filter(|p| in_window(p.at, start)).count() as u64;

  let mut per_month: BTreeMap<String, u64> = BTreeMap::new();
  for at in snapshot.sessions.iter().filter(|s| in_window(s.at, start)).filter_map(|s| s.at) {
    *per_month.entry(at.format("%Y-%m").to_string()).or_default() += 1;
  }

  ClinicalInsight {
    risk_factor_count: risks.iter().filter(|r| **r > 0).count() as u64,
    early_warning_count: risks.iter().filter(|r| **r > 2).count() as u64,
    imunisasi_kurang: children
      .iter()
      .filter_map(|c| c.immunization.as_ref())
      .filter(|i| i.has_gap())
      .count() as u64,
    family_structure: family,
    parent_education: education.into_iter().collect(),
    birth_place: birth_place.into_iter().collect(),
    assessment_conversion: AssessmentConversion {
      total_assessment,
      total_program,
      rate: percentage(total_program, total_assessment),
    },
    prior_therapy_count: children.iter().map(|c| c.prior_therapy_count).sum(),
    consultation_preference: consultation,
    sessions_per_month: per_month.into_iter().map(|(bulan, count)| MonthCount { bulan, count }).collect(),
    time_filter_applied: true,
  }
}

/// Full statistics for `window`, before role shaping.
pub fn dashboard_stats(
  snapshot: &DashboardSnapshot,
  tables:   &MappingSnapshot,
  window:   Window,
  now:      DateTime<Utc>,
) -> DashboardStats {
  let start    = window.start(now);
  let children = &snapshot.children;

  let complaint_counts = counts_from_labels(
    children
      .iter()
      .filter_map(|c| c.survey.as_ref())
      .flat_map(|s| s.complaints().iter()),
  );
  let top_keluhan = rank(complaint_counts.clone())
    .into_iter()
    .take(3)
    .map(|(keluhan, count)| ComplaintCount { keluhan, count })
    .collect();

  let referral_counts = tally(
    children
      .iter()
      .filter_map(|c| c.survey.as_ref())
      .filter_map(|s| s.mengetahui_yamet_dari.as_deref()),
  );

  let durations: Vec<f64> = children
    .iter()
    .filter_map(|c| Some((c.therapy_end? - c.therapy_start?).num_seconds() as f64 / (86_400.0 * 30.0)))
    .collect();
  let avg_duration = if durations.is_empty() {
    0.0
  } else {
    durations.iter().sum::<f64>() / durations.len() as f64
  };

  let exam_dates: Vec<DateTime<Utc>> = children
    .iter()
    .filter_map(|c| c.exam_date)
    .filter(|d| in_window(Some(*d), start))
    .collect();

  DashboardStats {
    total_anak: children.len() as u64,
    anak_keluar_bulan_lalu: children.iter().filter(|c| left_within(c, month_bounds(now, -1))).count() as u64,
    anak_keluar_bulan_ini: children.iter().filter(|c| left_within(c, month_bounds(now, 0))).count() as u64,
    anak_aktif: children.iter().filter(|c| c.status == ChildStatus::Active).count() as u64,
    conversion_data: conversion_summary(&snapshot.conversions),
    growth: window.growth(now, &exam_dates),
    period: window.as_ref().to_owned(),
    filter_applied: window.filter_label(now),
    total_admin: Some(active_users(&snapshot.users, Role::Admin)),
    total_terapis: Some(active_users(&snapshot.users, Role::Therapist)),
    total_manajer: Some(active_users(&snapshot.users, Role::Manager)),
    total_orangtua: active_users(&snapshot.users, Role::Parent),
    admin_input_stats: Some(admin_leaderboard(snapshot)),
    insight: Insight {
      top_keluhan,
      age_distribution: age_distribution(children, now),
      referral_source: Some(referral_counts.iter().cloned().collect()),
      therapy_success_count: Some(children.iter().filter(|c| c.status == ChildStatus::Graduated).count() as u64),
      avg_therapy_duration_month: Some(avg_duration),
      time_filter_applied: false,
    },
    clinical_insight: Some(clinical_insight(snapshot, start)),
    normalized_data: Some(NormalizedData {
      keluhan:          NormalizedBlock::build(MappingKind::Keluhan, tables, complaint_counts, 5),
      sumber_informasi: NormalizedBlock::build(MappingKind::Sumber, tables, referral_counts, 5),
    }),
  }
}

// ─── Normalized statistics ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TherapySuccess {
  pub jumlah_lulus:        u64,
  pub total_anak:          u64,
  pub persentase_berhasil: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizedStats {
  pub period:           String,
  pub filter_applied:   String,
  pub max_items:        usize,
  pub top_keluhan:      NormalizedBlock,
  pub sumber_informasi: NormalizedBlock,
  pub terapi_berhasil:  TherapySuccess,
}

/// Complaint and referral-source folding over children registered within
/// `window`.
pub fn normalized_stats(
  snapshot:  &DashboardSnapshot,
  tables:    &MappingSnapshot,
  window:    Window,
  max_items: usize,
  now:       DateTime<Utc>,
) -> NormalizedStats {
  let start = window.start(now);
  let children: Vec<&ChildFacts> = snapshot
    .children
    .iter()
    .filter(|c| in_window(Some(c.created_at), start))
    .collect();
  let surveys = || children.iter().filter_map(|c| c.survey.as_ref());

  let keluhan = counts_from_labels(surveys().flat_map(|s| s.complaints().iter()));
  let sumber  = counts_from_labels(surveys().filter_map(|s| s.mengetahui_yamet_dari.as_deref()));

  let graduated = children.iter().filter(|c| c.status == ChildStatus::Graduated).count() as u64;
  let total     = children.len() as u64;

  NormalizedStats {
    period: window.as_ref().to_owned(),
    filter_applied: window.filter_label(now),
    max_items,
    top_keluhan: NormalizedBlock::build(MappingKind::Keluhan, tables, keluhan, max_items),
    sumber_informasi: NormalizedBlock::build(MappingKind::Sumber, tables, sumber, max_items),
    terapi_berhasil: TherapySuccess {
      jumlah_lulus:        graduated,
      total_anak:          total,
      persentase_berhasil: percentage(graduated, total),
    },
  }
}

// ─── Marketing ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
  pub total:    u64,
  pub aktif:    u64,
  pub cuti:     u64,
  pub berhenti: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EducationCount {
  pub pendidikan: String,
  pub count:      u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupationCount {
  pub pekerjaan: String,
  pub count:     u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentData {
  pub pendidikan: Vec<EducationCount>,
  pub pekerjaan:  Vec<OccupationCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyGrowth {
  pub bulan:  String,
  pub jumlah: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBand {
  pub rentang: &'static str,
  pub jumlah:  u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketingDashboard {
  pub ringkasan_pasien:   PatientSummary,
  pub keluhan_terbanyak:  Vec<ComplaintCount>,
  pub data_orang_tua:     ParentData,
  pub pertumbuhan_pasien: Vec<MonthlyGrowth>,
  pub distribusi_usia:    Vec<AgeBand>,
}

pub(crate) const AGE_BANDS: [(&str, i32); 5] = [
  ("0-2 tahun", 2),
  ("3-5 tahun", 5),
  ("6-8 tahun", 8),
  ("9-12 tahun", 12),
  ("13+ tahun", i32::MAX),
];

/// The marketing team's all-time overview.
pub fn marketing_dashboard(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> MarketingDashboard {
  let children = &snapshot.children;
  let count_status = |s: ChildStatus| children.iter().filter(|c| c.status == s).count() as u64;

  let keluhan = rank(tally(
    children
      .iter()
      .filter_map(|c| c.survey.as_ref())
      .flat_map(|s| s.complaints().iter().map(String::as_str)),
  ));

  let parents: Vec<&ParentProfile> = children.iter().flat_map(|c| c.parents()).collect();
  let pendidikan = tally(parents.iter().filter_map(|p| p.pendidikan_terakhir.as_deref()));
  let pekerjaan  = tally(parents.iter().filter_map(|p| p.pekerjaan_saat_ini.as_deref()));

  let mut growth: BTreeMap<String, u64> = BTreeMap::new();
  for c in children {
    *growth.entry(c.created_at.format("%Y-%m").to_string()).or_default() += 1;
  }

  let mut bands = [0u64; AGE_BANDS.len()];
  for age in children.iter().filter_map(|c| c.birth_date).map(|b| year_age(b, now)) {
    if let Some(i) = AGE_BANDS.iter().position(|(_, max)| age <= *max) {
      bands[i] += 1;
    }
  }

  MarketingDashboard {
    ringkasan_pasien:   PatientSummary {
      total:    children.len() as u64,
      aktif:    count_status(ChildStatus::Active),
      cuti:     count_status(ChildStatus::OnLeave),
      berhenti: count_status(ChildStatus::Stopped),
    },
    keluhan_terbanyak:  keluhan
      .into_iter()
      .take(5)
      .map(|(keluhan, count)| ComplaintCount { keluhan, count })
      .collect(),
    data_orang_tua:     ParentData {
      pendidikan: pendidikan
        .into_iter()
        .map(|(pendidikan, count)| EducationCount { pendidikan, count })
        .collect(),
      pekerjaan:  pekerjaan
        .into_iter()
        .map(|(pekerjaan, count)| OccupationCount { pekerjaan, count })
        .collect(),
    },
    pertumbuhan_pasien: growth.into_iter().map(|(bulan, jumlah)| MonthlyGrowth { bulan, jumlah }).collect(),
    distribusi_usia:    AGE_BANDS
      .iter()
      .zip(bands)
      .map(|((rentang, _), jumlah)| AgeBand { rentang, jumlah })
      .collect(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone as _};
  use serde_json::json;

  use super::*;
  use crate::{normalize::NormalizerTables, user::UserStatus};

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap() }

  fn now() -> DateTime<Utc> { at(2025, 6, 15) }

  fn child(id: i64) -> ChildFacts {
    ChildFacts {
      id,
      status: ChildStatus::Active,
      gender: None,
      birth_date: None,
      birth_place: None,
      exam_date: None,
      therapy_start: None,
      therapy_end: None,
      created_at: now(),
      created_by: 1,
      survey: None,
      pregnancy: None,
      immunization: None,
      family: None,
      father: None,
      mother: None,
      prior_therapy_count: 0,
    }
  }

  fn user(id: i64, role: Role, status: UserStatus) -> User {
    User {
      id,
      name: format!("user {id}"),
      email: Some(format!("u{id}@yamet.id")),
      phone: None,
      role,
      status,
      created_by: None,
      created_at: now(),
      updated_at: now(),
    }
  }

  fn survey(complaints: &[&str], source: &str) -> Option<SurveyAnswers> {
    Some(SurveyAnswers {
      mengetahui_yamet_dari: Some(source.into()),
      bersedia_online:       Some(true),
      keluhan_orang_tua:     Some(complaints.iter().map(|s| s.to_string()).collect()),
      ..Default::default()
    })
  }

  fn snapshot() -> DashboardSnapshot {
    let mut a = child(1);
    a.exam_date = Some(at(2025, 6, 10));
    a.birth_date = Some(at(2020, 1, 1));
    a.survey = survey(&["Speech delay", "tantrum"], "IG");
    a.pregnancy = Some(PregnancyFlags { asma: Some(true), tbc: Some(true), merokok: Some(true), ..Default::default() });
    a.immunization = Some(ImmunizationRecord::default());
    a.family = Some(FamilySetup { tinggal_dengan: Some(vec!["Keluarga inti".into()]) });
    a.father = Some(ParentProfile {
      pendidikan_terakhir: Some("S1".into()),
      pekerjaan_saat_ini:  Some("Guru".into()),
      ..Default::default()
    });

    let mut b = child(2);
    b.exam_date = Some(at(2024, 1, 10));
    b.birth_date = Some(at(2024, 3, 1));
    b.survey = survey(&["belum bisa bicara"], "instagram");
    b.status = ChildStatus::Graduated;
    b.therapy_start = Some(at(2025, 3, 1));
    b.therapy_end = Some(at(2025, 6, 1));
    b.created_at = at(2024, 1, 10);
    b.created_by = 2;

    let mut c = child(3);
    c.status = ChildStatus::Stopped;
    c.therapy_end = Some(at(2025, 5, 20));
    c.created_by = 2;

    DashboardSnapshot {
      children:    vec![a, b, c],
      assessments: vec![
        Activity { at: Some(at(2025, 6, 1)), created_by: 2 },
        Activity { at: Some(at(2023, 6, 1)), created_by: 2 },
      ],
      programs:    vec![Activity { at: Some(at(2025, 6, 2)), created_by: 2 }],
      sessions:    vec![Activity { at: Some(at(2025, 6, 3)), created_by: 5 }],
      users:       vec![
        user(1, Role::SuperAdmin, UserStatus::Active),
        user(2, Role::Admin, UserStatus::Active),
        user(3, Role::Admin, UserStatus::Inactive),
        user(4, Role::Manager, UserStatus::Active),
        user(5, Role::Therapist, UserStatus::Active),
      ],
      conversions: Vec::new(),
    }
  }

  #[test]
  fn headline_numbers() {
    let tables = NormalizerTables::default().mappings();
    let stats  = dashboard_stats(&snapshot(), &tables, Window::OneMonth, now());
    assert_eq!(stats.total_anak, 3);
    assert_eq!(stats.anak_aktif, 1);
    assert_eq!(stats.anak_keluar_bulan_ini, 1);
    assert_eq!(stats.anak_keluar_bulan_lalu, 1);
    assert_eq!(stats.total_admin, Some(1));
    assert_eq!(stats.total_manajer, Some(1));
  }

  #[test]
  fn window_filters_clinical_but_not_insight() {
    let tables = NormalizerTables::default().mappings();
    let stats  = dashboard_stats(&snapshot(), &tables, Window::OneMonth, now());
    let clinical = stats.clinical_insight.clone().unwrap();
    assert!(clinical.time_filter_applied);
    assert_eq!(clinical.risk_factor_count, 1);
    assert_eq!(clinical.early_warning_count, 1);
    assert_eq!(clinical.imunisasi_kurang, 1);
    assert_eq!(clinical.family_structure, FamilyStructure { inti: 1, extended: 0 });
    assert_eq!(clinical.assessment_conversion.total_assessment, 1);
    assert_eq!(clinical.assessment_conversion.rate, 100.0);
    assert_eq!(clinical.sessions_per_month, vec![MonthCount { bulan: "2025-06".into(), count: 1 }]);

    assert!(!stats.insight.time_filter_applied);
    assert_eq!(stats.insight.therapy_success_count, Some(1));
    let ages = stats.insight.age_distribution;
    assert_eq!((ages.under_2, ages.over_6, ages.from_4), (1, 0, 1));
  }

  #[test]
  fn complaints_fold_through_tables() {
    let tables = NormalizerTables::default().mappings();
    let stats  = dashboard_stats(&snapshot(), &tables, Window::All, now());
    let data   = stats.normalized_data.unwrap();
    assert_eq!(data.keluhan.normalized[0].normalized, "terlambat bicara");
    assert_eq!(data.keluhan.normalized[0].count, 2);
    assert_eq!(data.sumber_informasi.normalized[0].normalized, "social media");
    assert_eq!(data.sumber_informasi.normalized[0].count, 2);
  }

  #[test]
  fn leaderboard_counts_active_admins_only() {
    let tables = NormalizerTables::default().mappings();
    let stats  = dashboard_stats(&snapshot(), &tables, Window::All, now());
    let board  = stats.admin_input_stats.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].admin_id, 2);
    assert_eq!(board[0].detail, InputDetail { anak: 2, penilaian: 2, program_terapi: 1, sesi_terapi: 0 });
    assert_eq!(board[0].total_input, 5);
  }

  #[test]
  fn role_shaping() {
    let tables = NormalizerTables::default().mappings();
    let full   = dashboard_stats(&snapshot(), &tables, Window::All, now());

    let manager = full.clone().shaped_for(Role::Manager);
    assert!(manager.total_manajer.is_none());
    assert!(manager.insight.avg_therapy_duration_month.is_none());
    assert!(manager.admin_input_stats.is_some());

    let admin = full.clone().shaped_for(Role::Admin);
    assert!(admin.admin_input_stats.is_none());
    assert!(admin.total_terapis.is_some());
    assert!(admin.clinical_insight.is_some());

    let other = full.shaped_for(Role::Therapist);
    let json  = serde_json::to_value(&other).unwrap();
    assert!(json.get("total_terapis").is_none());
    assert!(json.get("normalized_data").is_none());
    assert!(json["insight"].get("referral_source").is_none());
    assert_eq!(json["total_orangtua"], json!(0));
  }

  #[test]
  fn normalized_block_uses_domain_keys() {
    let tables = NormalizerTables::default().mappings();
    let block  = NormalizedBlock::build(MappingKind::Sumber, &tables, vec![("ig".into(), 2)], 5);
    let json   = serde_json::to_value(&block).unwrap();
    assert_eq!(json["raw_data"][0], json!({ "sumber": "ig", "count": 2 }));
    assert_eq!(json["summary"]["total_unique_sumber"], json!(1));
    assert_eq!(json["summary"]["top_sumber"]["normalized"], json!("social media"));
    assert_eq!(json["formatted"], json!("social media\n2 kasus"));
  }

  #[test]
  fn normalized_stats_filter_by_registration() {
    let tables = NormalizerTables::default().mappings();
    let stats  = normalized_stats(&snapshot(), &tables, Window::SixMonths, 5, now());
    assert_eq!(stats.terapi_berhasil.total_anak, 2);
    assert_eq!(stats.terapi_berhasil.jumlah_lulus, 0);
    assert_eq!(stats.top_keluhan.raw, vec![("speech delay".to_owned(), 1), ("tantrum".to_owned(), 1)]);

    let all = normalized_stats(&snapshot(), &tables, Window::All, 5, now());
    assert_eq!(all.terapi_berhasil.persentase_berhasil, 33.33);
  }

  #[test]
  fn marketing_overview() {
    let mut snap = snapshot();
    snap.children[2].created_at = now() - Duration::days(40);
    let m = marketing_dashboard(&snap, now());
    assert_eq!(m.ringkasan_pasien, PatientSummary { total: 3, aktif: 1, cuti: 0, berhenti: 1 });
    assert_eq!(m.keluhan_terbanyak.len(), 3);
    assert_eq!(m.data_orang_tua.pekerjaan, vec![OccupationCount { pekerjaan: "Guru".into(), count: 1 }]);
    let months: Vec<_> = m.pertumbuhan_pasien.iter().map(|g| g.bulan.as_str()).collect();
    assert_eq!(months, vec!["2024-01", "2025-05", "2025-06"]);
    let bands: Vec<_> = m.distribusi_usia.iter().map(|b| (b.rentang, b.jumlah)).collect();
    assert_eq!(bands[0], ("0-2 tahun", 1));
    assert_eq!(bands[1], ("3-5 tahun", 1));
  }
}

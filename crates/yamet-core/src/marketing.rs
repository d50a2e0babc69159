//! Marketing insight beyond the dashboard: a summary with recommendations,
//! content ideas, and the target-audience profile.
//!
//! Everything is computed over all time from a [`DashboardSnapshot`].
//! Recommendations come from fixed lookup tables keyed by the exact labels
//! parents pick in the intake survey. Labels outside the tables get a
//! generic line.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  child::{ChildStatus, Gender},
  dashboard::{AGE_BANDS, AgeBand, ChildFacts, ComplaintCount, DashboardSnapshot, tally, year_age},
  normalize::rank,
};

fn ranked<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<(String, u64)> { rank(tally(labels)) }

fn complaints(children: &[&ChildFacts]) -> Vec<(String, u64)> {
  ranked(
    children
      .iter()
      .filter_map(|c| c.survey.as_ref())
      .flat_map(|s| s.complaints().iter().map(String::as_str)),
  )
}

fn sources(children: &[&ChildFacts]) -> Vec<(String, u64)> {
  ranked(
    children
      .iter()
      .filter_map(|c| c.survey.as_ref())
      .filter_map(|s| s.mengetahui_yamet_dari.as_deref()),
  )
}

// ─── Overview ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub total_pasien:     u64,
  pub pasien_aktif:     u64,
  /// Whole percent.
  pub persentase_aktif: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
  pub sumber: String,
  pub count:  u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickInsight {
  pub keluhan_teratas:          Vec<ComplaintCount>,
  pub sumber_informasi_teratas: Vec<SourceCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
  pub nama:      &'static str,
  pub endpoint:  &'static str,
  pub deskripsi: &'static str,
  pub fitur:     &'static [&'static str],
}

const MENU: [MenuEntry; 3] = [
  MenuEntry {
    nama:      "Dashboard",
    endpoint:  "/api/marketing/dashboard",
    deskripsi: "Ringkasan data pasien, keluhan terbanyak, data orang tua, pertumbuhan pasien",
    fitur:     &["Ringkasan Data Pasien", "Keluhan Terbanyak", "Data Orang Tua", "Pertumbuhan Pasien"],
  },
  MenuEntry {
    nama:      "Konten",
    endpoint:  "/api/marketing/konten",
    deskripsi: "Ide konten, konten sesuai usia, solusi masalah",
    fitur:     &["Ide Konten", "Konten Sesuai Usia", "Solusi Masalah"],
  },
  MenuEntry {
    nama:      "Target Audiens",
    endpoint:  "/api/marketing/target-audiens",
    deskripsi: "Profil pasien, tempat tinggal, pekerjaan",
    fitur:     &["Profil Pasien", "Tempat Tinggal", "Pekerjaan Orang Tua"],
  },
];

/// Suggestions derived from the top complaints and sources. Each list keeps
/// first-seen order without repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recommendations {
  pub konten_prioritas:  Vec<String>,
  pub channel_marketing: Vec<String>,
  pub target_audiens:    Vec<String>,
  pub strategi_konten:   Vec<String>,
}

fn push_unique(list: &mut Vec<String>, items: &[&str]) {
  for item in items {
    if !list.iter().any(|l| l == item) {
      list.push((*item).to_owned());
    }
  }
}

fn recommend(complaints: &[ComplaintCount], sources: &[SourceCount]) -> Recommendations {
  let mut out = Recommendations::default();
  for c in complaints {
    let (topic, audience) = match c.keluhan.as_str() {
      "Sulit bicara" => ("Tips melatih kemampuan bicara anak", "Orang tua anak usia 2-5 tahun"),
      "Sering tantrum" => ("Cara mengatasi tantrum anak", "Orang tua anak usia 1-4 tahun"),
      "Kurang konsentrasi" => ("Latihan konsentrasi untuk anak", "Orang tua anak usia 3-8 tahun"),
      other => {
        push_unique(&mut out.konten_prioritas, &[format!("Konten tentang {other}").as_str()]);
        continue;
      }
    };
    push_unique(&mut out.konten_prioritas, &[topic]);
    push_unique(&mut out.target_audiens, &[audience]);
  }

  for s in sources {
    let (channels, strategies): (&[&str], &[&str]) = match s.sumber.as_str() {
      "Internet" => (&["SEO optimization", "Website content"], &["Blog posts", "Video edukasi"]),
      "Sosial Media" => (&["Instagram", "Facebook", "TikTok"], &["Short videos", "Infographics"]),
      "Teman/Keluarga" => (&["Referral program", "Word of mouth"], &["Testimoni", "Success stories"]),
      "Dokter" => (&["Partnership dengan dokter"], &["Medical content", "Expert interviews"]),
      _ => (&["Multi-channel approach"], &[]),
    };
    push_unique(&mut out.channel_marketing, channels);
    push_unique(&mut out.strategi_konten, strategies);
  }
  out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketingOverview {
  pub ringkasan:             Summary,
  pub insight_cepat:         QuickInsight,
  pub menu_tersedia:         Vec<MenuEntry>,
  pub rekomendasi_marketing: Recommendations,
}

/// `GET /marketing`: headline numbers, the top three complaints and sources,
/// and what to do about them.
pub fn marketing_overview(snapshot: &DashboardSnapshot) -> MarketingOverview {
  let children: Vec<&ChildFacts> = snapshot.children.iter().collect();
  let total  = children.len() as u64;
  let active = children.iter().filter(|c| c.status == ChildStatus::Active).count() as u64;

  let keluhan: Vec<ComplaintCount> = complaints(&children)
    .into_iter()
    .take(3)
    .map(|(keluhan, count)| ComplaintCount { keluhan, count })
    .collect();
  let sumber: Vec<SourceCount> = sources(&children)
    .into_iter()
    .take(3)
    .map(|(sumber, count)| SourceCount { sumber, count })
    .collect();

  MarketingOverview {
    ringkasan:             Summary {
      total_pasien:     total,
      pasien_aktif:     active,
      persentase_aktif: if total == 0 { 0 } else { (active as f64 / total as f64 * 100.0).round() as u64 },
    },
    rekomendasi_marketing: recommend(&keluhan, &sumber),
    insight_cepat:         QuickInsight { keluhan_teratas: keluhan, sumber_informasi_teratas: sumber },
    menu_tersedia:         MENU.to_vec(),
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

fn content_idea(complaint: &str) -> String {
  let idea = match complaint {
    "Sulit bicara" => "Tips melatih kemampuan bicara anak usia dini",
    "Sering tantrum" => "Cara mengatasi tantrum anak dengan efektif",
    "Kurang konsentrasi" => "Latihan konsentrasi untuk anak hiperaktif",
    "Sulit makan" => "Strategi mengatasi anak picky eater",
    "Tidur tidak teratur" => "Tips mengatur pola tidur anak",
    "Sulit bersosialisasi" => "Cara membantu anak bersosialisasi",
    "Keterlambatan perkembangan" => "Tanda-tanda keterlambatan perkembangan yang perlu diperhatikan",
    "Masalah motorik" => "Latihan motorik halus dan kasar untuk anak",
    "Masalah emosional" => "Mengelola emosi anak dengan bijak",
    "Masalah belajar" => "Strategi belajar efektif untuk anak berkebutuhan khusus",
    other => return format!("Konten edukasi tentang {other}"),
  };
  idea.to_owned()
}

fn audience_for(complaint: &str) -> &'static str {
  match complaint {
    "Sulit bicara" => "Orang tua anak usia 2-5 tahun",
    "Sering tantrum" => "Orang tua anak usia 1-4 tahun",
    "Kurang konsentrasi" => "Orang tua anak usia 3-8 tahun",
    "Sulit makan" => "Orang tua anak usia 1-6 tahun",
    "Tidur tidak teratur" => "Orang tua bayi dan balita",
    "Sulit bersosialisasi" => "Orang tua anak usia 3-7 tahun",
    "Keterlambatan perkembangan" => "Orang tua anak usia 0-6 tahun",
    "Masalah motorik" => "Orang tua anak usia 2-8 tahun",
    "Masalah emosional" => "Orang tua anak usia 3-10 tahun",
    "Masalah belajar" => "Orang tua anak usia 5-12 tahun",
    _ => "Orang tua anak berkebutuhan khusus",
  }
}

fn solution_for(obstacle: &str) -> String {
  let solution = match obstacle {
    "Biaya" => "Program terapi dengan biaya terjangkau dan cicilan",
    "Jarak jauh" => "Layanan terapi online dan home visit",
    "Waktu" => "Jadwal terapi yang fleksibel",
    "Stigma" => "Edukasi masyarakat tentang terapi anak",
    "Kurang informasi" => "Konsultasi gratis dan webinar edukasi",
    "Tidak ada dukungan keluarga" => "Program konseling keluarga",
    "Fasilitas terbatas" => "Kerjasama dengan berbagai fasilitas kesehatan",
    other => return format!("Solusi untuk mengatasi {other}"),
  };
  solution.to_owned()
}

fn marketing_tip(obstacle: &str) -> String {
  let tip = match obstacle {
    "Biaya" => "Highlight value for money, program cicilan, dan asuransi",
    "Jarak jauh" => "Promosikan layanan online dan home visit",
    "Waktu" => "Tampilkan jadwal fleksibel dan kemudahan booking",
    "Stigma" => "Konten edukasi dan testimoni sukses",
    "Kurang informasi" => "Konten edukasi gratis dan konsultasi online",
    "Tidak ada dukungan keluarga" => "Program konseling dan support group",
    "Fasilitas terbatas" => "Kerjasama dan referral program",
    other => return format!("Tips marketing untuk mengatasi {other}"),
  };
  tip.to_owned()
}

fn action_insight(action: &str) -> String {
  let insight = match action {
    "Sudah terapi" => "Target untuk program lanjutan dan maintenance",
    "Konsultasi dokter" => "Kerjasama dengan dokter dan referral program",
    "Mencari informasi" => "Konten edukasi dan SEO optimization",
    "Belum ada tindakan" => "Awareness campaign dan free consultation",
    "Mencoba alternatif" => "Highlight keunggulan dan testimoni",
    "Menunggu" => "Follow-up campaign dan reminder",
    other => return format!("Insight untuk tindakan {other}"),
  };
  insight.to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentIdea {
  pub keluhan:        String,
  pub frekuensi:      u64,
  pub ide_konten:     String,
  pub target_audiens: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeContent {
  pub rentang_usia:       &'static str,
  pub jumlah_pasien:      u64,
  pub konten_rekomendasi: &'static [&'static str],
  /// Top three complaints in the band.
  pub keluhan_umum:       Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleSolution {
  pub kendala:        String,
  pub frekuensi:      u64,
  pub solusi:         String,
  pub tips_marketing: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentAction {
  pub tindakan:          String,
  pub frekuensi:         u64,
  pub insight_marketing: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentInsight {
  pub ide_konten:                  Vec<ContentIdea>,
  pub konten_sesuai_usia:          Vec<AgeContent>,
  pub solusi_masalah:              Vec<ObstacleSolution>,
  pub analisis_tindakan_orang_tua: Vec<ParentAction>,
}

/// Content bands stop at twelve; older children are left out.
const CONTENT_BANDS: [(&str, i32, &[&str]); 4] = [
  ("0-2 tahun", 2, &[
    "Stimulasi perkembangan bayi",
    "Tanda-tanda keterlambatan perkembangan",
    "Nutrisi untuk tumbuh kembang optimal",
  ]),
  ("3-5 tahun", 5, &[
    "Latihan kemampuan bicara dan bahasa",
    "Aktivitas motorik untuk balita",
    "Persiapan masuk sekolah",
  ]),
  ("6-8 tahun", 8, &[
    "Strategi belajar untuk anak SD",
    "Mengatasi masalah konsentrasi",
    "Pengembangan keterampilan sosial",
  ]),
  ("9-12 tahun", 12, &[
    "Mengelola emosi anak pra-remaja",
    "Strategi belajar efektif",
    "Persiapan masa pubertas",
  ]),
];

/// Index of the first band whose upper age covers `age`.
fn band_of(age: i32, maxima: impl IntoIterator<Item = i32>) -> Option<usize> {
  maxima.into_iter().position(|max| age <= max)
}

/// `GET /marketing/konten`
pub fn content_insight(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> ContentInsight {
  let children: Vec<&ChildFacts> = snapshot.children.iter().collect();
  let surveys = || children.iter().filter_map(|c| c.survey.as_ref());

  let ide_konten = complaints(&children)
    .into_iter()
    .take(10)
    .map(|(keluhan, frekuensi)| ContentIdea {
      ide_konten: content_idea(&keluhan),
      target_audiens: audience_for(&keluhan),
      keluhan,
      frekuensi,
    })
    .collect();

  let mut banded: [Vec<&ChildFacts>; CONTENT_BANDS.len()] = Default::default();
  for child in &children {
    let Some(birth) = child.birth_date else { continue };
    if let Some(i) = band_of(year_age(birth, now), CONTENT_BANDS.iter().map(|b| b.1)) {
      banded[i].push(child);
    }
  }
  let konten_sesuai_usia = CONTENT_BANDS
    .iter()
    .zip(&banded)
    .map(|((rentang_usia, _, konten), members)| AgeContent {
      rentang_usia,
      jumlah_pasien: members.len() as u64,
      konten_rekomendasi: konten,
      keluhan_umum: complaints(members).into_iter().take(3).map(|(k, _)| k).collect(),
    })
    .collect();

  let solusi_masalah = ranked(surveys().flat_map(|s| s.obstacles().iter().map(String::as_str)))
    .into_iter()
    .map(|(kendala, frekuensi)| ObstacleSolution {
      solusi: solution_for(&kendala),
      tips_marketing: marketing_tip(&kendala),
      kendala,
      frekuensi,
    })
    .collect();

  let analisis_tindakan_orang_tua = ranked(surveys().flat_map(|s| s.parent_actions().iter().map(String::as_str)))
    .into_iter()
    .map(|(tindakan, frekuensi)| ParentAction {
      insight_marketing: action_insight(&tindakan),
      tindakan,
      frekuensi,
    })
    .collect();

  ContentInsight { ide_konten, konten_sesuai_usia, solusi_masalah, analisis_tindakan_orang_tua }
}

// ─── Target audience ─────────────────────────────────────────────────────────

/// Active, on-leave and stopped children behind a label. Graduates are not
/// counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSplit {
  pub aktif:    u64,
  pub cuti:     u64,
  pub berhenti: u64,
}

impl StatusSplit {
  fn add(&mut self, status: ChildStatus) {
    match status {
      ChildStatus::Active => self.aktif += 1,
      ChildStatus::OnLeave => self.cuti += 1,
      ChildStatus::Stopped => self.berhenti += 1,
      ChildStatus::Graduated => {}
    }
  }
}

/// Per-label counts plus a status split, both in first-seen order.
#[derive(Debug, Default)]
struct Breakdown(Vec<(String, u64, StatusSplit)>);

impl Breakdown {
  fn add(&mut self, label: &str, status: ChildStatus) {
    let label = label.trim();
    if label.is_empty() {
      return;
    }
    let i = match self.0.iter().position(|(l, ..)| l == label) {
      Some(i) => i,
      None => {
        self.0.push((label.to_owned(), 0, StatusSplit::default()));
        self.0.len() - 1
      }
    };
    let (_, count, split) = &mut self.0[i];
    *count += 1;
    split.add(status);
  }

  fn ranked(&self) -> Vec<(String, u64)> { rank(self.0.iter().map(|(l, c, _)| (l.clone(), *c)).collect()) }

  fn splits(&self) -> impl Iterator<Item = (String, StatusSplit)> + '_ {
    self.0.iter().map(|(l, _, s)| (l.clone(), *s))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
  pub gender: Gender,
  pub jumlah: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
  pub status: ChildStatus,
  pub jumlah: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplaintTally {
  pub keluhan: String,
  pub jumlah:  u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientProfile {
  pub distribusi_usia:   Vec<AgeBand>,
  pub distribusi_gender: Vec<GenderCount>,
  pub distribusi_status: Vec<StatusCount>,
  pub keluhan_terbanyak: Vec<ComplaintTally>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityCount {
  pub kota:   String,
  pub jumlah: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityStatus {
  pub kota:  String,
  #[serde(flatten)]
  pub split: StatusSplit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Residence {
  pub distribusi_lokasi: Vec<CityCount>,
  pub status_per_lokasi: Vec<CityStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobCount {
  pub pekerjaan: String,
  pub jumlah:    u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EducationTally {
  pub pendidikan: String,
  pub jumlah:     u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
  pub pekerjaan: String,
  #[serde(flatten)]
  pub split:     StatusSplit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentOccupations {
  pub distribusi_pekerjaan:  Vec<JobCount>,
  pub distribusi_pendidikan: Vec<EducationTally>,
  pub status_per_pekerjaan:  Vec<JobStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTally {
  pub sumber: String,
  pub jumlah: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
  pub sumber: String,
  #[serde(flatten)]
  pub split:  StatusSplit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InformationSources {
  pub distribusi_sumber: Vec<SourceTally>,
  pub status_per_sumber: Vec<SourceStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
  pub segmen:             &'static str,
  pub karakteristik:      &'static str,
  pub konten_rekomendasi: &'static [&'static str],
  pub channel_marketing:  &'static [&'static str],
  pub budget_estimasi:    &'static str,
  pub jumlah_pasien:      u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetAudience {
  pub profil_pasien:       PatientProfile,
  pub tempat_tinggal:      Residence,
  pub pekerjaan_orang_tua: ParentOccupations,
  pub sumber_informasi:    InformationSources,
  pub segmentasi_target:   Vec<Segment>,
}

/// Cities recognised in free-text addresses, checked in order.
const CITIES: [(&str, &[&str]); 10] = [
  ("Batam", &["batam"]),
  ("Jakarta", &["jakarta"]),
  ("Surabaya", &["surabaya"]),
  ("Bandung", &["bandung"]),
  ("Medan", &["medan"]),
  ("Semarang", &["semarang"]),
  ("Yogyakarta", &["yogyakarta", "jogja"]),
  ("Makassar", &["makassar"]),
  ("Palembang", &["palembang"]),
  ("Manado", &["manado"]),
];

/// The city named in an address, or `Lainnya`.
pub fn city_of(address: &str) -> &'static str {
  let address = address.to_lowercase();
  CITIES
    .iter()
    .find(|(_, needles)| needles.iter().any(|n| address.contains(*n)))
    .map_or("Lainnya", |(city, _)| *city)
}

const SEGMENTS: [Segment; 4] = [
  Segment {
    segmen:             "Bayi (0-2 tahun)",
    karakteristik:      "Orang tua baru, mencari informasi perkembangan",
    konten_rekomendasi: &["Stimulasi bayi", "Tanda-tanda keterlambatan", "Nutrisi"],
    channel_marketing:  &["Instagram", "Facebook", "YouTube"],
    budget_estimasi:    "Menengah ke atas",
    jumlah_pasien:      0,
  },
  Segment {
    segmen:             "Balita (3-5 tahun)",
    karakteristik:      "Orang tua aktif mencari solusi masalah perkembangan",
    konten_rekomendasi: &["Latihan bicara", "Aktivitas motorik", "Persiapan sekolah"],
    channel_marketing:  &["Instagram", "TikTok", "WhatsApp"],
    budget_estimasi:    "Menengah",
    jumlah_pasien:      0,
  },
  Segment {
    segmen:             "Anak SD (6-8 tahun)",
    karakteristik:      "Orang tua fokus pada masalah belajar dan sosialisasi",
    konten_rekomendasi: &["Strategi belajar", "Konsentrasi", "Sosialisasi"],
    channel_marketing:  &["Facebook", "Instagram", "Website"],
    budget_estimasi:    "Menengah ke bawah",
    jumlah_pasien:      0,
  },
  Segment {
    segmen:             "Pra-remaja (9-12 tahun)",
    karakteristik:      "Orang tua menghadapi masalah emosional dan akademik",
    konten_rekomendasi: &["Manajemen emosi", "Strategi belajar", "Persiapan pubertas"],
    channel_marketing:  &["Website", "Email", "Facebook"],
    budget_estimasi:    "Menengah",
    jumlah_pasien:      0,
  },
];

/// Upper age of each segment, in [`SEGMENTS`] order.
const SEGMENT_MAX_AGE: [i32; 4] = [2, 5, 8, 12];

/// `GET /marketing/target-audiens`
///
/// Residence and occupation count parents, so a child with both parents on
/// file contributes twice there.
pub fn target_audience(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> TargetAudience {
  let children: Vec<&ChildFacts> = snapshot.children.iter().collect();
  let ages: Vec<i32> = children.iter().filter_map(|c| c.birth_date).map(|b| year_age(b, now)).collect();

  let mut age_bands = [0u64; AGE_BANDS.len()];
  let mut segments  = SEGMENTS;
  for &age in &ages {
    if let Some(i) = band_of(age, AGE_BANDS.iter().map(|b| b.1)) {
      age_bands[i] += 1;
    }
    if let Some(i) = band_of(age, SEGMENT_MAX_AGE) {
      segments[i].jumlah_pasien += 1;
    }
  }

  let profil_pasien = PatientProfile {
    distribusi_usia:   AGE_BANDS
      .iter()
      .zip(age_bands)
      .map(|((rentang, _), jumlah)| AgeBand { rentang, jumlah })
      .collect(),
    distribusi_gender: [Gender::Male, Gender::Female]
      .into_iter()
      .map(|gender| GenderCount {
        gender,
        jumlah: children.iter().filter(|c| c.gender == Some(gender)).count() as u64,
      })
      .collect(),
    distribusi_status: [ChildStatus::Active, ChildStatus::OnLeave, ChildStatus::Stopped, ChildStatus::Graduated]
      .into_iter()
      .map(|status| StatusCount {
        status,
        jumlah: children.iter().filter(|c| c.status == status).count() as u64,
      })
      .collect(),
    keluhan_terbanyak: complaints(&children)
      .into_iter()
      .take(5)
      .map(|(keluhan, jumlah)| ComplaintTally { keluhan, jumlah })
      .collect(),
  };

  let mut cities     = Breakdown::default();
  let mut jobs       = Breakdown::default();
  let mut educations = Breakdown::default();
  let mut origins    = Breakdown::default();
  for child in &children {
    for parent in child.parents() {
      if let Some(address) = parent.alamat_rumah.as_deref().filter(|a| !a.trim().is_empty()) {
        cities.add(city_of(address), child.status);
      }
      if let Some(job) = parent.pekerjaan_saat_ini.as_deref() {
        jobs.add(job, child.status);
      }
      if let Some(education) = parent.pendidikan_terakhir.as_deref() {
        educations.add(education, child.status);
      }
    }
    if let Some(source) = child.survey.as_ref().and_then(|s| s.mengetahui_yamet_dari.as_deref()) {
      origins.add(source, child.status);
    }
  }

  TargetAudience {
    profil_pasien,
    tempat_tinggal: Residence {
      distribusi_lokasi: cities.ranked().into_iter().map(|(kota, jumlah)| CityCount { kota, jumlah }).collect(),
      status_per_lokasi: cities.splits().map(|(kota, split)| CityStatus { kota, split }).collect(),
    },
    pekerjaan_orang_tua: ParentOccupations {
      distribusi_pekerjaan:  jobs
        .ranked()
        .into_iter()
        .map(|(pekerjaan, jumlah)| JobCount { pekerjaan, jumlah })
        .collect(),
      distribusi_pendidikan: educations
        .ranked()
        .into_iter()
        .map(|(pendidikan, jumlah)| EducationTally { pendidikan, jumlah })
        .collect(),
      status_per_pekerjaan:  jobs.splits().map(|(pekerjaan, split)| JobStatus { pekerjaan, split }).collect(),
    },
    sumber_informasi: InformationSources {
      distribusi_sumber: origins.ranked().into_iter().map(|(sumber, jumlah)| SourceTally { sumber, jumlah }).collect(),
      status_per_sumber: origins.splits().map(|(sumber, split)| SourceStatus { sumber, split }).collect(),
    },
    segmentasi_target: segments.to_vec(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use serde_json::json;

  use super::*;
  use crate::dashboard::{ParentProfile, SurveyAnswers};

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap() }

  fn now() -> DateTime<Utc> { at(2025, 6, 15) }

  fn child(id: i64, status: ChildStatus, born: i32) -> ChildFacts {
    ChildFacts {
      id,
      status,
      gender: Some(Gender::Female),
      birth_date: Some(at(born, 1, 1)),
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

  fn survey(complaints: &[&str], source: &str, obstacles: &[&str]) -> Option<SurveyAnswers> {
    let list = |items: &[&str]| Some(items.iter().map(|s| s.to_string()).collect());
    Some(SurveyAnswers {
      mengetahui_yamet_dari: Some(source.into()),
      keluhan_orang_tua: list(complaints),
      kendala: list(obstacles),
      tindakan_orang_tua: list(&["Konsultasi dokter"]),
      ..Default::default()
    })
  }

  fn parent(job: &str, address: &str) -> Option<ParentProfile> {
    Some(ParentProfile {
      pekerjaan_saat_ini: Some(job.into()),
      alamat_rumah: Some(address.into()),
      ..Default::default()
    })
  }

  fn snapshot() -> DashboardSnapshot {
    let mut a = child(1, ChildStatus::Active, 2022);
    a.survey = survey(&["Sulit bicara", "Sering tantrum"], "Sosial Media", &["Biaya"]);
    a.father = parent("Wiraswasta", "Jl. Sudirman, Batam Centre");
    a.mother = parent("Guru", "Perum Jogja Asri");

    let mut b = child(2, ChildStatus::OnLeave, 2018);
    b.gender = Some(Gender::Male);
    b.survey = survey(&["Sulit bicara"], "Dokter", &["Biaya", "Jarak jauh"]);
    b.mother = parent("Wiraswasta", "Desa Sukamaju");

    let mut c = child(3, ChildStatus::Graduated, 2010);
    c.survey = survey(&["Gagap"], "Sosial Media", &[]);

    DashboardSnapshot { children: vec![a, b, c], ..Default::default() }
  }

  #[test]
  fn overview_summarises_and_recommends() {
    let out = marketing_overview(&snapshot());
    assert_eq!(out.ringkasan, Summary { total_pasien: 3, pasien_aktif: 1, persentase_aktif: 33 });
    assert_eq!(out.insight_cepat.keluhan_teratas[0], ComplaintCount { keluhan: "Sulit bicara".into(), count: 2 });
    assert_eq!(out.insight_cepat.sumber_informasi_teratas[0].sumber, "Sosial Media");

    let rec = &out.rekomendasi_marketing;
    assert_eq!(rec.konten_prioritas, vec![
      "Tips melatih kemampuan bicara anak",
      "Cara mengatasi tantrum anak",
      "Konten tentang Gagap",
    ]);
    assert_eq!(rec.channel_marketing, vec!["Instagram", "Facebook", "TikTok", "Partnership dengan dokter"]);
    assert_eq!(out.menu_tersedia.len(), 3);
  }

  #[test]
  fn empty_snapshot_reports_zero_percent() {
    let out = marketing_overview(&DashboardSnapshot::default());
    assert_eq!(out.ringkasan.persentase_aktif, 0);
    assert!(out.rekomendasi_marketing.konten_prioritas.is_empty());
  }

  #[test]
  fn content_ideas_follow_complaints_and_obstacles() {
    let out = content_insight(&snapshot(), now());
    assert_eq!(out.ide_konten[0].keluhan, "Sulit bicara");
    assert_eq!(out.ide_konten[0].frekuensi, 2);
    assert_eq!(out.ide_konten[0].target_audiens, "Orang tua anak usia 2-5 tahun");
    assert_eq!(out.ide_konten[2].ide_konten, "Konten edukasi tentang Gagap");

    assert_eq!(out.solusi_masalah[0].kendala, "Biaya");
    assert_eq!(out.solusi_masalah[0].frekuensi, 2);
    assert_eq!(out.solusi_masalah[1].solusi, "Layanan terapi online dan home visit");
    assert_eq!(out.analisis_tindakan_orang_tua[0].frekuensi, 3);
  }

  #[test]
  fn content_bands_skip_teenagers() {
    let out = content_insight(&snapshot(), now());
    let counts: Vec<u64> = out.konten_sesuai_usia.iter().map(|b| b.jumlah_pasien).collect();
    // Ages 3 and 7; the fifteen-year-old falls outside every band.
    assert_eq!(counts, vec![0, 1, 1, 0]);
    assert_eq!(out.konten_sesuai_usia[1].keluhan_umum, vec!["Sulit bicara", "Sering tantrum"]);
  }

  #[test]
  fn addresses_resolve_to_cities() {
    assert_eq!(city_of("Jl. Sudirman, BATAM"), "Batam");
    assert_eq!(city_of("Sleman, Jogja"), "Yogyakarta");
    assert_eq!(city_of("Desa Sukamaju"), "Lainnya");
  }

  #[test]
  fn audience_counts_parents_and_splits_by_status() {
    let out = target_audience(&snapshot(), now());

    let jobs = &out.pekerjaan_orang_tua;
    assert_eq!(jobs.distribusi_pekerjaan[0], JobCount { pekerjaan: "Wiraswasta".into(), jumlah: 2 });
    assert_eq!(jobs.status_per_pekerjaan[0].split, StatusSplit { aktif: 1, cuti: 1, berhenti: 0 });

    let cities: Vec<&str> = out.tempat_tinggal.distribusi_lokasi.iter().map(|c| c.kota.as_str()).collect();
    assert_eq!(cities, vec!["Batam", "Yogyakarta", "Lainnya"]);

    let sources = &out.sumber_informasi.status_per_sumber;
    assert_eq!(sources[0].sumber, "Sosial Media");
    assert_eq!(sources[0].split, StatusSplit { aktif: 1, cuti: 0, berhenti: 0 });

    let segments: Vec<u64> = out.segmentasi_target.iter().map(|s| s.jumlah_pasien).collect();
    assert_eq!(segments, vec![0, 1, 1, 0]);
  }

  #[test]
  fn audience_profile_serializes_with_wire_names() {
    let out = target_audience(&snapshot(), now());
    let json = serde_json::to_value(&out.profil_pasien).unwrap();
    assert_eq!(json["distribusi_gender"][0], json!({ "gender": "LAKI_LAKI", "jumlah": 1 }));
    assert_eq!(json["distribusi_status"][3], json!({ "status": "LULUS", "jumlah": 1 }));
    assert_eq!(json["distribusi_usia"][4], json!({ "rentang": "13+ tahun", "jumlah": 1 }));

    let split = serde_json::to_value(&out.tempat_tinggal.status_per_lokasi[0]).unwrap();
    assert_eq!(split, json!({ "kota": "Batam", "aktif": 1, "cuti": 0, "berhenti": 0 }));
  }
}

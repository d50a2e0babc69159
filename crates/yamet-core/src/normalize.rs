//! Folding free-text survey answers onto canonical labels.
//!
//! Parents describe the same complaint ("speech delay", "belum bisa bicara")
//! or the same referral source ("ig", "instagram") in many ways. A
//! [`MappingTable`] maps each known raw phrasing to a canonical label, and
//! [`normalize`] folds counted labels through it. Labels the table does not
//! know pass through unchanged.
//!
//! The live tables are held by [`NormalizerTables`]. Readers take a cheap
//! snapshot; admin additions copy the table and publish the new version in
//! one step. Additions are not persisted.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

// ─── Table ───────────────────────────────────────────────────────────────────

/// Raw phrasing (lower-case, trimmed) → canonical label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTable(BTreeMap<String, String>);

impl MappingTable {
  pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
    let mut table = Self::default();
    for (raw, canonical) in pairs {
      table.insert(raw, canonical);
    }
    table
  }

  /// Insert an entry. Both sides are lower-cased and trimmed; the last write
  /// for a key wins.
  pub fn insert(&mut self, raw: &str, canonical: &str) {
    self.0.insert(fold_key(raw), fold_key(canonical));
  }

  /// Canonical label for `raw`, falling back to the folded key itself.
  pub fn canonical(&self, raw: &str) -> String {
    let key = fold_key(raw);
    match self.0.get(&key) {
      Some(c) => c.clone(),
      None => key,
    }
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

fn fold_key(s: &str) -> String { s.trim().to_lowercase() }

// ─── Fold ────────────────────────────────────────────────────────────────────

/// One canonical bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
  /// Distinct raw labels folded into this bucket, joined with `", "`.
  pub original:   String,
  pub normalized: String,
  pub count:      u64,
}

/// Fold `(label, count)` pairs through `table`.
///
/// Buckets are sorted by descending count. Equal counts keep the order in
/// which their canonical label was first seen.
pub fn normalize<S: AsRef<str>>(table: &MappingTable, items: &[(S, u64)]) -> Vec<NormalizedItem> {
  // (normalized, distinct originals, count)
  let mut order: Vec<(String, Vec<&str>, u64)> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();

  for (label, count) in items {
    let label      = label.as_ref();
    let normalized = table.canonical(label);
    match index.get(&normalized) {
      Some(&i) => {
        let (_, originals, total) = &mut order[i];
        *total += count;
        if !originals.contains(&label) {
          originals.push(label);
        }
      }
      None => {
        index.insert(normalized.clone(), order.len());
        order.push((normalized, vec![label], *count));
      }
    }
  }

  // `sort_by` is stable, so ties keep first-seen order.
  order.sort_by(|a, b| b.2.cmp(&a.2));
  order
    .into_iter()
    .map(|(normalized, originals, count)| NormalizedItem {
      original: originals.join(", "),
      normalized,
      count,
    })
    .collect()
}

/// Count labels in first-seen order. Labels are trimmed and lower-cased and
/// blanks are skipped.
pub fn counts_from_labels<I, S>(labels: I) -> Vec<(String, u64)>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut counts: Vec<(String, u64)> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();
  for label in labels {
    let key = fold_key(label.as_ref());
    if key.is_empty() {
      continue;
    }
    match index.get(&key) {
      Some(&i) => counts[i].1 += 1,
      None => {
        index.insert(key.clone(), counts.len());
        counts.push((key, 1));
      }
    }
  }
  counts
}

/// Sort raw counts by descending count, stable on ties.
pub fn rank(mut counts: Vec<(String, u64)>) -> Vec<(String, u64)> {
  counts.sort_by(|a, b| b.1.cmp(&a.1));
  counts
}

/// Render the top `max` buckets for display.
pub fn format_top(items: &[NormalizedItem], max: usize) -> String {
  items
    .iter()
    .take(max)
    .map(|i| format!("{}\n{} kasus", i.normalized, i.count))
    .collect::<Vec<_>>()
    .join("\n\n")
}

// ─── Live tables ─────────────────────────────────────────────────────────────

/// The two free-text domains that get normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MappingKind {
  /// Parent complaints (`keluhan`).
  Keluhan,
  /// Referral sources (`sumber`).
  Sumber,
}

/// A consistent view of both tables.
#[derive(Debug, Clone, Serialize)]
pub struct MappingSnapshot {
  pub keluhan: Arc<MappingTable>,
  pub sumber:  Arc<MappingTable>,
}

impl MappingSnapshot {
  pub fn table(&self, kind: MappingKind) -> &MappingTable {
    match kind {
      MappingKind::Keluhan => &self.keluhan,
      MappingKind::Sumber => &self.sumber,
    }
  }
}

/// Process-wide mapping tables, injected into whoever needs them.
#[derive(Debug)]
pub struct NormalizerTables {
  inner: RwLock<MappingSnapshot>,
}

impl Default for NormalizerTables {
  fn default() -> Self { Self::new(default_keluhan(), default_sumber()) }
}

impl NormalizerTables {
  pub fn new(keluhan: MappingTable, sumber: MappingTable) -> Self {
    Self {
      inner: RwLock::new(MappingSnapshot {
        keluhan: Arc::new(keluhan),
        sumber:  Arc::new(sumber),
      }),
    }
  }

  /// The current tables.
  pub fn mappings(&self) -> MappingSnapshot {
    match self.inner.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  /// Add one entry and publish the updated tables. Returns the new snapshot.
  pub fn add_mapping(&self, kind: MappingKind, raw: &str, canonical: &str) -> MappingSnapshot {
    let mut guard = match self.inner.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    let slot = match kind {
      MappingKind::Keluhan => &mut guard.keluhan,
      MappingKind::Sumber => &mut guard.sumber,
    };
    let mut next = MappingTable::clone(slot);
    next.insert(raw, canonical);
    *slot = Arc::new(next);
    guard.clone()
  }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

/// Built-in complaint phrasings.
pub fn default_keluhan() -> MappingTable {
  MappingTable::from_pairs([
    ("sulit bicara", "terlambat bicara"),
    ("terlambat bicara", "terlambat bicara"),
    ("belum bisa bicara", "terlambat bicara"),
    ("belum lancar bicara", "terlambat bicara"),
    ("speech delay", "terlambat bicara"),
    ("keterlambatan bicara", "terlambat bicara"),
    ("belum bisa ngomong", "terlambat bicara"),
    ("belum bisa berbicara", "terlambat bicara"),
    ("sulit fokus", "kurang fokus"),
    ("kurang fokus", "kurang fokus"),
    ("tidak fokus", "kurang fokus"),
    ("attention deficit", "kurang fokus"),
    ("konsentrasi rendah", "kurang fokus"),
    ("tidak bisa fokus", "kurang fokus"),
    ("belum bisa fokus", "kurang fokus"),
    ("hyperaktif", "hyperaktif"),
    ("hiperaktif", "hyperaktif"),
    ("sangat aktif", "hyperaktif"),
    ("tidak bisa diam", "hyperaktif"),
    ("over aktif", "hyperaktif"),
    ("terlalu aktif", "hyperaktif"),
    ("sering tantrum", "sering tantrum"),
    ("tantrum", "sering tantrum"),
    ("mudah marah", "sering tantrum"),
    ("emosi tidak stabil", "sering tantrum"),
    ("sering ngamuk", "sering tantrum"),
    ("mudah emosi", "sering tantrum"),
    ("autis", "autisme"),
    ("autisme", "autisme"),
    ("spektrum autisme", "autisme"),
    ("asd", "autisme"),
    ("down syndrome", "down syndrome"),
    ("down", "down syndrome"),
    ("sindrom down", "down syndrome"),
    ("cerebral palsy", "cerebral palsy"),
    ("cp", "cerebral palsy"),
    ("gangguan motorik", "gangguan motorik"),
    ("motorik kasar", "gangguan motorik"),
    ("motorik halus", "gangguan motorik"),
    ("keterlambatan motorik", "gangguan motorik"),
    ("gangguan sensorik", "gangguan sensorik"),
    ("sensory processing", "gangguan sensorik"),
    ("hipersensitif", "gangguan sensorik"),
    ("hiposensitif", "gangguan sensorik"),
    ("gangguan tidur", "gangguan tidur"),
    ("sulit tidur", "gangguan tidur"),
    ("insomnia", "gangguan tidur"),
    ("tidur tidak teratur", "gangguan tidur"),
    ("gangguan makan", "gangguan makan"),
    ("picky eater", "gangguan makan"),
    ("sulit makan", "gangguan makan"),
    ("selective eating", "gangguan makan"),
    ("gangguan sosial", "gangguan sosial"),
    ("sulit bergaul", "gangguan sosial"),
    ("tidak mau bermain", "gangguan sosial"),
    ("isolasi sosial", "gangguan sosial"),
    ("gangguan belajar", "gangguan belajar"),
    ("learning disability", "gangguan belajar"),
    ("sulit belajar", "gangguan belajar"),
    ("keterlambatan akademik", "gangguan belajar"),
    ("gangguan perilaku", "gangguan perilaku"),
    ("behavioral disorder", "gangguan perilaku"),
    ("perilaku tidak sesuai", "gangguan perilaku"),
    ("gangguan emosi", "gangguan emosi"),
    ("mood swing", "gangguan emosi"),
    ("gangguan komunikasi", "gangguan komunikasi"),
    ("sulit berkomunikasi", "gangguan komunikasi"),
    ("komunikasi terbatas", "gangguan komunikasi"),
    ("gangguan kognitif", "gangguan kognitif"),
    ("keterlambatan kognitif", "gangguan kognitif"),
    ("iq rendah", "gangguan kognitif"),
    ("gangguan fisik", "gangguan fisik"),
    ("cacat fisik", "gangguan fisik"),
    ("disabilitas fisik", "gangguan fisik"),
    ("gangguan pendengaran", "gangguan pendengaran"),
    ("tuli", "gangguan pendengaran"),
    ("hearing loss", "gangguan pendengaran"),
    ("gangguan penglihatan", "gangguan penglihatan"),
    ("buta", "gangguan penglihatan"),
    ("visual impairment", "gangguan penglihatan"),
    ("gangguan perkembangan", "gangguan perkembangan"),
    ("developmental delay", "gangguan perkembangan"),
    ("keterlambatan perkembangan", "gangguan perkembangan"),
    ("global delay", "gangguan perkembangan"),
  ])
}

/// Built-in referral-source phrasings.
pub fn default_sumber() -> MappingTable {
  MappingTable::from_pairs([
    ("internet", "internet"),
    ("google", "internet"),
    ("googling", "internet"),
    ("browsing", "internet"),
    ("web", "internet"),
    ("online", "internet"),
    ("search engine", "internet"),
    ("social media", "social media"),
    ("sosmed", "social media"),
    ("instagram", "social media"),
    ("ig", "social media"),
    ("facebook", "social media"),
    ("fb", "social media"),
    ("twitter", "social media"),
    ("tiktok", "social media"),
    ("youtube", "social media"),
    ("sosial media", "social media"),
    ("teman", "rekomendasi teman"),
    ("teman sekolah", "rekomendasi teman"),
    ("teman-teman", "rekomendasi teman"),
    ("rekomendasi teman", "rekomendasi teman"),
    ("sahabat", "rekomendasi teman"),
    ("kawan", "rekomendasi teman"),
    ("saudara", "rekomendasi keluarga"),
    ("kakak", "rekomendasi keluarga"),
    ("adik", "rekomendasi keluarga"),
    ("orang tua", "rekomendasi keluarga"),
    ("ibu", "rekomendasi keluarga"),
    ("ayah", "rekomendasi keluarga"),
    ("nenek", "rekomendasi keluarga"),
    ("kakek", "rekomendasi keluarga"),
    ("keluarga", "rekomendasi keluarga"),
    ("tetangga", "rekomendasi tetangga"),
    ("neighbor", "rekomendasi tetangga"),
    ("dokter", "rekomendasi medis"),
    ("rekomendasi dokter", "rekomendasi medis"),
    ("rekomendasi dokter anak", "rekomendasi medis"),
    ("dokter anak", "rekomendasi medis"),
    ("pediatrician", "rekomendasi medis"),
    ("psikolog", "rekomendasi medis"),
    ("psikiater", "rekomendasi medis"),
    ("terapis", "rekomendasi medis"),
    ("fisioterapis", "rekomendasi medis"),
    ("okupasi terapis", "rekomendasi medis"),
    ("speech therapist", "rekomendasi medis"),
    ("rumah sakit", "rumah sakit/klinik"),
    ("rs", "rumah sakit/klinik"),
    ("klinik", "rumah sakit/klinik"),
    ("tempat terapi", "rumah sakit/klinik"),
    ("tempat terapi rumah sakit", "rumah sakit/klinik"),
    ("hospital", "rumah sakit/klinik"),
    ("medical center", "rumah sakit/klinik"),
    ("sekolah", "sekolah"),
    ("guru", "sekolah"),
    ("teacher", "sekolah"),
    ("institution", "sekolah"),
    ("lembaga pendidikan", "sekolah"),
    ("google maps", "google maps"),
    ("maps", "google maps"),
    ("lokasi", "google maps"),
    ("location", "google maps"),
    ("orang tua siswa", "orang tua siswa"),
    ("parent", "orang tua siswa"),
    ("wali murid", "orang tua siswa"),
    ("anak ke 2 diyamet", "anak ke-2 di yamet"),
    ("anak kedua di yamet", "anak ke-2 di yamet"),
    ("anak kedua yamet", "anak ke-2 di yamet"),
    ("anak ke 2 di yamet", "anak ke-2 di yamet"),
    ("teman dan sosmed", "kombinasi"),
    ("teman/instagram", "kombinasi"),
    ("sosmed/ig yamet", "kombinasi"),
    ("instagram/sekolah", "kombinasi"),
    ("teman dan internet", "kombinasi"),
    ("sosmed dan teman", "kombinasi"),
    ("lainnya", "lainnya"),
    ("other", "lainnya"),
    ("tidak tahu", "lainnya"),
    ("tidak ingat", "lainnya"),
    ("lupa", "lainnya"),
  ])
}

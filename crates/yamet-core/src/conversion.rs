//! Monthly marketing conversion figures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One month of lead and conversion counts. Unique per `(bulan, tahun)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
  pub id:                 i64,
  pub bulan:              String,
  pub tahun:              i32,
  pub jumlah_leads:       i64,
  pub jumlah_conversi:    i64,
  pub jumlah_anak_keluar: i64,
  pub created_by:         i64,
  pub updated_by:         Option<i64>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

/// All writable columns of a conversion row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionInput {
  pub bulan:              String,
  pub tahun:              i32,
  pub jumlah_leads:       i64,
  pub jumlah_conversi:    i64,
  pub jumlah_anak_keluar: i64,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionPatch {
  pub bulan:              Option<String>,
  pub tahun:              Option<i32>,
  pub jumlah_leads:       Option<i64>,
  pub jumlah_conversi:    Option<i64>,
  pub jumlah_anak_keluar: Option<i64>,
}

impl ConversionPatch {
  pub fn apply(self, current: &Conversion) -> ConversionInput {
    ConversionInput {
      bulan:              self.bulan.unwrap_or_else(|| current.bulan.clone()),
      tahun:              self.tahun.unwrap_or(current.tahun),
      jumlah_leads:       self.jumlah_leads.unwrap_or(current.jumlah_leads),
      jumlah_conversi:    self.jumlah_conversi.unwrap_or(current.jumlah_conversi),
      jumlah_anak_keluar: self.jumlah_anak_keluar.unwrap_or(current.jumlah_anak_keluar),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct ConversionQuery {
  /// Case-insensitive substring of `bulan`.
  pub search: Option<String>,
  pub bulan:  Option<String>,
  pub tahun:  Option<i32>,
  pub page:   u32,
  pub limit:  u32,
}

/// `conversions / leads * 100`, rounded to two decimals. Zero leads give 0.
pub fn conversion_rate(leads: i64, conversions: i64) -> f64 {
  if leads <= 0 {
    return 0.0;
  }
  let rate = conversions as f64 / leads as f64 * 100.0;
  (rate * 100.0).round() / 100.0
}

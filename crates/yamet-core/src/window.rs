//! Analytics time windows and the growth series bucketed over them.

use chrono::{DateTime, Datelike as _, Months, NaiveDate, TimeZone as _, Utc};
use serde::Serialize;
use strum::{AsRefStr, EnumString};

/// The requested analytics range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, EnumString)]
pub enum Window {
  #[strum(serialize = "all")]
  All,
  #[default]
  #[strum(serialize = "1month")]
  OneMonth,
  #[strum(serialize = "4month")]
  FourMonths,
  #[strum(serialize = "6month")]
  SixMonths,
  #[strum(serialize = "1year")]
  OneYear,
}

/// One bar of a growth chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
  pub period: String,
  pub count:  u64,
}

const MONTH_ABBR: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

impl Window {
  /// Parse a query value; unknown values fall back to `fallback`.
  pub fn parse_or(raw: Option<&str>, fallback: Window) -> Window {
    raw.and_then(|s| s.parse().ok()).unwrap_or(fallback)
  }

  fn months(self) -> Option<u32> {
    match self {
      Window::All => None,
      Window::OneMonth => Some(1),
      Window::FourMonths => Some(4),
      Window::SixMonths => Some(6),
      Window::OneYear => Some(12),
    }
  }

  /// Start of the window, or `None` for all time. Calendar months are
  /// subtracted, clamping to the end of shorter months.
  pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    self.months().and_then(|m| now.checked_sub_months(Months::new(m)))
  }

  /// Human form of the start for response payloads.
  pub fn filter_label(self, now: DateTime<Utc>) -> String {
    match self.start(now) {
      Some(start) => start.to_rfc3339(),
      None => "all_time".to_owned(),
    }
  }

  /// Bucket `dates` into the chart series for this window.
  ///
  /// One month gives four trailing seven-day buckets (`Minggu 1` oldest).
  /// Four, six and twelve months give one bucket per calendar month labelled
  /// `Mon YY`. All time gives one bucket per year that has data.
  pub fn growth(self, now: DateTime<Utc>, dates: &[DateTime<Utc>]) -> Vec<GrowthPoint> {
    match self {
      Window::OneMonth => (0..4)
        .rev()
        .map(|i| {
          let count = dates
            .iter()
            .filter(|d| {
              let days = (now - **d).num_days();
              days >= i * 7 && days < (i + 1) * 7
            })
            .count();
          GrowthPoint { period: format!("Minggu {}", 4 - i), count: count as u64 }
        })
        .collect(),
      Window::All => {
        let mut years: Vec<i32> = dates.iter().map(|d| d.year()).collect();
        years.sort_unstable();
        years.dedup();
        years
          .into_iter()
          .map(|y| GrowthPoint {
            period: y.to_string(),
            count:  dates.iter().filter(|d| d.year() == y).count() as u64,
          })
          .collect()
      }
      _ => {
        let n = self.months().unwrap_or(1) as i32;
        (0..n)
          .rev()
          .map(|i| {
            let (y, m) = shift_month(now.year(), now.month(), -i);
            let count = dates.iter().filter(|d| d.year() == y && d.month() == m).count();
            GrowthPoint { period: month_label(y, m), count: count as u64 }
          })
          .collect()
      }
    }
  }
}

/// `(year, month)` moved by `delta` calendar months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
  let index = year * 12 + month as i32 - 1 + delta;
  (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// `Mon YY` with Indonesian month abbreviations.
pub fn month_label(year: i32, month: u32) -> String {
  let name = MONTH_ABBR[(month as usize).saturating_sub(1) % 12];
  format!("{name} {:02}", year.rem_euclid(100))
}

/// Inclusive start and exclusive end of the calendar month `delta` months
/// from the one containing `now`.
pub fn month_bounds(now: DateTime<Utc>, delta: i32) -> (DateTime<Utc>, DateTime<Utc>) {
  let (y, m)   = shift_month(now.year(), now.month(), delta);
  let (ny, nm) = shift_month(y, m, 1);
  (first_of(y, m), first_of(ny, nm))
}

fn first_of(year: i32, month: u32) -> DateTime<Utc> {
  NaiveDate::from_ymd_opt(year, month, 1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|n| Utc.from_utc_datetime(&n))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

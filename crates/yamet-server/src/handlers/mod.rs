//! Route handlers, one module per resource.
//!
//! Every guarded handler takes [`crate::auth::CurrentUser`] first and calls
//! `require` before it looks at the request body.

pub mod attachments;
pub mod auth;
pub mod children;
pub mod clinical;
pub mod conversions;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod settings;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use yamet_core::{child::parse_date, intake::FieldIssue, store::page_window};

/// `?page=&limit=` shared by every listing.
#[derive(Debug, Default, Deserialize)]
pub struct Paging {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

impl Paging {
  pub fn window(&self) -> (u32, u32) { window(self.page, self.limit) }
}

/// Clamped `(page, limit)` from raw query values.
pub(crate) fn window(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
  let (page, limit, _) = page_window(page.unwrap_or(1), limit.unwrap_or(0));
  (page, limit)
}

/// Parse an optional date field, recording an issue when it is malformed.
pub(crate) fn date_field(
  field:  &str,
  raw:    Option<&str>,
  issues: &mut Vec<FieldIssue>,
) -> Option<DateTime<Utc>> {
  match raw.map(parse_date)? {
    Ok(date) => date,
    Err(_) => {
      issues.push(FieldIssue::new(field, "invalid_date", "Invalid date"));
      None
    }
  }
}

/// A required non-empty text field.
pub(crate) fn text_field(field: &str, raw: Option<String>, issues: &mut Vec<FieldIssue>) -> String {
  match raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()) {
    Some(s) => s,
    None => {
      issues.push(FieldIssue::new(field, "invalid_type", "Required"));
      String::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn paging_defaults_and_clamps() {
    assert_eq!(Paging::default().window(), (1, 10));
    assert_eq!(Paging { page: Some(0), limit: Some(500) }.window(), (1, 100));
  }

  #[test]
  fn date_field_reports_bad_input() {
    let mut issues = Vec::new();
    assert!(date_field("start_date", Some("2025-02-01"), &mut issues).is_some());
    assert_eq!(date_field("start_date", Some(""), &mut issues), None);
    assert_eq!(date_field("end_date", Some("besok"), &mut issues), None);
    assert_eq!(date_field("end_date", None, &mut issues), None);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field, "end_date");
  }
}

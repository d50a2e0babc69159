//! The singleton application branding row.

use serde::{Deserialize, Serialize};

use crate::intake::FieldIssue;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  pub app_name:     Option<String>,
  pub logo_url:     Option<String>,
  pub color_schema: Option<String>,
}

impl AppConfig {
  /// Every field is required and non-empty on save.
  pub fn validate(&self) -> Result<(), Vec<FieldIssue>> {
    let checks = [
      ("appName", &self.app_name, "Nama aplikasi wajib diisi"),
      ("logoUrl", &self.logo_url, "Logo wajib diisi"),
      ("colorSchema", &self.color_schema, "Color schema wajib diisi"),
    ];
    let issues: Vec<FieldIssue> = checks
      .into_iter()
      .filter(|(_, v, _)| v.as_deref().is_none_or(str::is_empty))
      .map(|(field, _, message)| FieldIssue::new(field, "too_small", message))
      .collect();
    if issues.is_empty() { Ok(()) } else { Err(issues) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_fields_are_reported_by_wire_name() {
    let cfg = AppConfig {
      app_name:     Some("YAMET".into()),
      logo_url:     Some(String::new()),
      color_schema: None,
    };
    let issues = cfg.validate().unwrap_err();
    let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
    assert_eq!(fields, vec!["logoUrl", "colorSchema"]);
    assert_eq!(issues[0].message, "Logo wajib diisi");
  }

  #[test]
  fn serializes_camel_case() {
    let json = serde_json::to_value(AppConfig::default()).unwrap();
    assert!(json.get("appName").is_some());
    assert!(json["colorSchema"].is_null());
  }
}

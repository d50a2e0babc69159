//! The success envelope: `{"status":"success", message?, data, pagination?}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use yamet_core::store::{Page, Pagination};

#[derive(Debug, Serialize)]
struct Envelope<T> {
  status:     &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  message:    Option<String>,
  data:       T,
  #[serde(skip_serializing_if = "Option::is_none")]
  pagination: Option<Pagination>,
}

/// A successful handler result.
#[derive(Debug)]
pub struct Reply<T> {
  code:     StatusCode,
  envelope: Envelope<T>,
}

impl<T: Serialize> Reply<T> {
  pub fn ok(data: T) -> Self {
    Self {
      code:     StatusCode::OK,
      envelope: Envelope { status: "success", message: None, data, pagination: None },
    }
  }

  pub fn created(data: T) -> Self { Self { code: StatusCode::CREATED, ..Self::ok(data) } }

  pub fn message(mut self, message: impl Into<String>) -> Self {
    self.envelope.message = Some(message.into());
    self
  }

  pub fn paginated(mut self, page: u32, limit: u32, total: u64) -> Self {
    self.envelope.pagination = Some(Pagination::new(page, limit, total));
    self
  }
}

impl<T: Serialize> Reply<Vec<T>> {
  /// One page of a listing; `page_no` and `limit` are the clamped values.
  pub fn page(page: Page<T>, page_no: u32, limit: u32) -> Self {
    let total = page.total;
    Self::ok(page.items).paginated(page_no, limit, total)
  }
}

impl<T: Serialize> IntoResponse for Reply<T> {
  fn into_response(self) -> Response { (self.code, Json(self.envelope)).into_response() }
}

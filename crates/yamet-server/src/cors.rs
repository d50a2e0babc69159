//! CORS policy: any origin while developing, an allow-list in production.

use std::time::Duration;

use axum::http::{
  HeaderValue, Method,
  header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{Environment, ServerConfig};

pub fn layer(config: &ServerConfig) -> CorsLayer {
  let base = CorsLayer::new()
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
    .allow_headers([CONTENT_TYPE, AUTHORIZATION])
    .max_age(Duration::from_secs(86_400));

  match config.environment {
    Environment::Development => base.allow_origin(Any),
    Environment::Production => {
      let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
          Ok(v) => Some(v),
          Err(_) => {
            tracing::warn!(%origin, "ignoring unparseable CORS origin");
            None
          }
        })
        .collect();
      base.allow_origin(AllowOrigin::list(origins))
    }
  }
}

//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// A collaborator failed; the caller may retry.
  #[error("upstream error: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sopready_core::Error> for ApiError {
  fn from(e: sopready_core::Error) -> Self {
    use sopready_core::Error as Core;
    match e {
      Core::FacilityNotFound(_) | Core::RequirementNotFound(_) => Self::NotFound(e.to_string()),
      Core::Validation(m) => Self::BadRequest(m),
      Core::Duplicate(m) => Self::Conflict(format!("{m} already exists")),
      Core::Upstream(inner) => Self::Upstream(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Upstream(e) => {
        tracing::error!(error = %e, "request failed on a collaborator");
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

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

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<formfill_core::Error> for ApiError {
  fn from(e: formfill_core::Error) -> Self {
    use formfill_core::Error as E;
    match e {
      E::Validation(m) => Self::BadRequest(m),
      E::ProfileNotFound(_) | E::MappingNotFound { .. } => Self::NotFound(e.to_string()),
      E::Conflict(m) => Self::Conflict(m),
      E::Store(inner) => Self::Store(inner),
      E::Serialization(inner) => Self::Store(Box::new(inner)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::Value;

  use super::*;

  async fn render(e: formfill_core::Error) -> (StatusCode, Value) {
    let resp = ApiError::from(e).into_response();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn exhausted_retries_are_a_conflict() {
    let (status, body) = render(formfill_core::Error::Conflict(
      "mapping for p still contended after 3 attempts".into(),
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "mapping for p still contended after 3 attempts");
  }

  #[tokio::test]
  async fn store_failures_keep_their_message() {
    let (status, body) =
      render(formfill_core::Error::store(std::io::Error::other("disk I/O error"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "disk I/O error");
  }

  #[tokio::test]
  async fn validation_and_missing_documents() {
    let (status, body) = render(formfill_core::Error::Validation("missing pageId".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing pageId");

    let (status, _) = render(formfill_core::Error::ProfileNotFound("a@b.c".into())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}

//! API error type, [`IntoResponse`] implementation and the extractor wrappers
//! that route axum rejections through it.

use axum::{
  Json,
  extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("too large: {0}")]
  TooLarge(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn internal(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self::Internal(e.into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, m),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
      ApiError::InvalidInput(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::TooLarge(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

// ─── Extractor wrappers ──────────────────────────────────────────────────────

/// [`axum::Json`] whose rejection is a 400 [`ApiError::InvalidInput`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// [`axum::extract::Path`] whose rejection is a 404: a malformed id names
/// nothing that exists.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParams<T>(pub T);

/// [`axum::extract::Query`] whose rejection is a 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::InvalidInput(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    tracing::debug!(reason = %rejection.body_text(), "unparseable path parameter");
    ApiError::NotFound("not found".to_string())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::InvalidInput(rejection.body_text()) }
}

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;

  use super::*;

  async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn status_codes_follow_taxonomy() {
    let cases = [
      (ApiError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
      (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
      (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
      (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
      (ApiError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
      (ApiError::TooLarge("x".into()), StatusCode::BAD_REQUEST),
    ];
    for (err, status) in cases {
      let (got, body) = body_of(err).await;
      assert_eq!(got, status);
      assert_eq!(body["error"], "x");
    }
  }

  #[tokio::test]
  async fn internal_hides_details() {
    let err = ApiError::internal("disk on fire at /var/lib/geobase");
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
  }
}

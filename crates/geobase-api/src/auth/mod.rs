//! Identity: the Token Authority, the Credential Store and the [`Caller`]
//! extractor that opens every authenticated request.

pub mod password;
pub mod token;

mod extract;

pub use extract::Caller;
pub use token::{Claims, TokenAuthority, token_from_headers};

use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no auth token provided")]
  Missing,
  #[error("auth token revoked")]
  Revoked,
  #[error("invalid auth token: {0}")]
  Invalid(#[source] jsonwebtoken::errors::Error),
  #[error("failed to sign token: {0}")]
  Sign(#[source] jsonwebtoken::errors::Error),
  #[error("revocation list unavailable: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    match e {
      Error::Missing => ApiError::Unauthenticated("No auth token provided".into()),
      Error::Revoked => {
        tracing::warn!("revoked token presented");
        ApiError::Unauthenticated("Auth token blacklisted".into())
      }
      Error::Invalid(e) => {
        tracing::debug!(error = %e, "token rejected");
        ApiError::Unauthenticated("Invalid auth token".into())
      }
      Error::Sign(e) => ApiError::internal(e),
      Error::Store(e) => ApiError::Internal(e),
    }
  }
}

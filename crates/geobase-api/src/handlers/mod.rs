//! Route handlers, one module per resource.
//!
//! Responses wrap their payload in a single named key
//! (`{"storypoints": [...]}`, `{"user": {...}}`), and projections are
//! explicit so internal fields such as password hashes never reach the wire.

pub mod companies;
pub mod files;
pub mod session;
pub mod storypoints;
pub mod users;

use geobase_core::{
  store::{GeoStore, StoreError},
  storypoint::Storypoint,
  validate::{is_strong_password, is_valid_email, is_valid_filename},
};
use uuid::Uuid;

use crate::{config::ValidationConfig, error::ApiError};

/// Box a store error into [`ApiError::Internal`].
pub(crate) fn store_err<E>(e: E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ApiError::Internal(Box::new(e))
}

/// Map a failed write. A uniqueness violation that got past the duplicate
/// check (a concurrent request won) is a 409 with `reason`; anything else is
/// a 500.
pub(crate) fn write_err<E: StoreError>(reason: &'static str) -> impl FnOnce(E) -> ApiError {
  move |e| {
    if e.is_conflict() {
      tracing::debug!(error = %e, "write lost a uniqueness race");
      ApiError::Conflict(reason.into())
    } else {
      store_err(e)
    }
  }
}

/// Load a storypoint of `company_id` or fail with 404.
pub(crate) async fn require_storypoint<S: GeoStore>(
  store: &S,
  company_id: Uuid,
  storypoint_id: Uuid,
) -> Result<Storypoint, ApiError> {
  store
    .get_storypoint(company_id, storypoint_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("Storypoint not found".into()))
}

// ─── Validation ──────────────────────────────────────────────────────────────

pub(crate) fn check_email(rules: &ValidationConfig, email: &str) -> Result<(), ApiError> {
  if rules.email && !is_valid_email(email) {
    return Err(ApiError::InvalidInput("Invalid email".into()));
  }
  Ok(())
}

pub(crate) fn check_password(rules: &ValidationConfig, password: &str) -> Result<(), ApiError> {
  if rules.password && !is_strong_password(password) {
    return Err(ApiError::InvalidInput(
      "Invalid password: at least 8 characters with upper and lower case letters, a digit and a \
       symbol"
        .into(),
    ));
  }
  Ok(())
}

pub(crate) fn check_filename(rules: &ValidationConfig, filename: &str) -> Result<(), ApiError> {
  if filename.is_empty() || (rules.filename && !is_valid_filename(filename)) {
    return Err(ApiError::InvalidInput("Invalid filename".into()));
  }
  Ok(())
}

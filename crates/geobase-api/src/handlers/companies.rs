//! `POST /api/companies`: register a company together with its first user.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
};
use geobase_core::{
  blob::BlobStore,
  company::NewCompany,
  store::GeoStore,
  user::NewUser,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{check_email, check_password, store_err, write_err};
use crate::{
  AppState,
  auth::{self, Claims, password, token_from_headers},
  error::{ApiError, JsonBody},
};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  pub fullname:    String,
  pub email:       String,
  pub password:    String,
}

/// A token that verifies blocks registration. Any other rejection reads as an
/// anonymous caller, except a failed revocation lookup: then there is no
/// telling whether the caller is logged in.
fn refuse_if_logged_in(verified: Result<Claims, auth::Error>) -> Result<(), ApiError> {
  match verified {
    Ok(_) => Err(ApiError::Forbidden("User already logged in".into())),
    Err(e @ auth::Error::Store(_)) => Err(e.into()),
    Err(_) => Ok(()),
  }
}

/// `POST /api/companies`
///
/// Open to anonymous callers only: a request that carries a valid session
/// token is refused with 403.
pub async fn register<S, B>(
  State(state): State<AppState<S, B>>,
  headers: HeaderMap,
  JsonBody(body): JsonBody<RegisterBody>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  if let Some(token) = token_from_headers(&headers) {
    refuse_if_logged_in(state.tokens.verify(state.store.as_ref(), token).await)?;
  }

  if body.name.trim().is_empty() {
    return Err(ApiError::InvalidInput("Company name must not be empty".into()));
  }
  check_email(&state.config.validation, &body.email)?;
  check_password(&state.config.validation, &body.password)?;

  if state
    .store
    .find_company_by_name(&body.name)
    .await
    .map_err(store_err)?
    .is_some()
  {
    return Err(ApiError::Conflict("Company with this name already exists".into()));
  }
  if state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(store_err)?
    .is_some()
  {
    return Err(ApiError::Conflict("Email already in use".into()));
  }

  let password_hash = password::hash_blocking(body.password).await?;
  let (company, user) = state
    .store
    .register_company(
      NewCompany { name: body.name, description: body.description },
      NewUser {
        // Assigned by the store once the company exists.
        company_id: Uuid::nil(),
        fullname: body.fullname,
        email: body.email,
        password_hash,
      },
    )
    .await
    .map_err(write_err("Company name or email already in use"))?;

  let token = state.tokens.issue(user.id, &user.email)?;
  tracing::info!(company = %company.id, user = %user.id, name = %company.name, "company registered");

  Ok((
    StatusCode::CREATED,
    Json(json!({ "company_id": company.id, "user_id": user.id, "token": token })),
  ))
}

#[cfg(test)]
mod tests {
  use std::io;

  use super::*;

  fn claims() -> Claims {
    Claims {
      sub:   Uuid::new_v4(),
      email: "a@alpha.io".into(),
      jti:   Uuid::new_v4(),
      iat:   0,
      exp:   None,
    }
  }

  #[test]
  fn valid_token_blocks_registration() {
    assert!(matches!(refuse_if_logged_in(Ok(claims())), Err(ApiError::Forbidden(_))));
  }

  #[test]
  fn missing_or_revoked_token_counts_as_anonymous() {
    assert!(refuse_if_logged_in(Err(auth::Error::Missing)).is_ok());
    assert!(refuse_if_logged_in(Err(auth::Error::Revoked)).is_ok());
  }

  #[test]
  fn unreadable_revocation_list_is_internal() {
    let down = auth::Error::Store(Box::new(io::Error::other("database is locked")));
    assert!(matches!(refuse_if_logged_in(Err(down)), Err(ApiError::Internal(_))));
  }
}

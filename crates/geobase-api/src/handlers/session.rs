//! Handlers for login, logout and the caller's own profile.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/login` | Body: `{"email":..,"password":..}`; 404 unknown e-mail, 401 wrong password |
//! | `POST` | `/api/logout` | Revokes the presented token |
//! | `GET`  | `/api/user` | The caller's profile |

use axum::{Json, extract::State, http::StatusCode};
use geobase_core::{blob::BlobStore, store::GeoStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::store_err;
use crate::{
  AppState,
  auth::{Caller, password},
  error::{ApiError, JsonBody},
};

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /api/login`
pub async fn login<S, B>(
  State(state): State<AppState<S, B>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

  if !password::verify_blocking(body.password, user.password_hash.clone()).await? {
    tracing::warn!(user = %user.id, "rejected login: incorrect password");
    return Err(ApiError::Unauthenticated("Incorrect password".into()));
  }

  let token = state.tokens.issue(user.id, &user.email)?;
  tracing::info!(user = %user.id, "user logged in");
  Ok(Json(json!({ "token": token })))
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /api/logout`
pub async fn logout<S, B>(
  State(state): State<AppState<S, B>>,
  caller: Caller,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  state.tokens.revoke(state.store.as_ref(), &caller.token).await?;
  tracing::info!(user = %caller.user_id, "user logged out");
  Ok(StatusCode::OK)
}

// ─── Profile ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Profile {
  pub id:         Uuid,
  pub fullname:   String,
  pub email:      String,
  pub company_id: Uuid,
}

/// `GET /api/user`
pub async fn profile<S, B>(
  State(state): State<AppState<S, B>>,
  caller: Caller,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let user = state
    .store
    .get_user(caller.user_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

  let profile = Profile {
    id:         user.id,
    fullname:   user.fullname,
    email:      user.email,
    company_id: user.company_id,
  };
  Ok(Json(json!({ "user": profile })))
}

//! Handlers for `/api/companies/{company_id}/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | `{id,fullname,email}` per member |
//! | `POST`   | `/users` | Body: `{"fullname","email","password"}`; new member of this company |
//! | `GET`    | `/users/{id}` | 404 for users of other companies |
//! | `PUT`    | `/users/{id}` | Any of `fullname`, `email`, `password` |
//! | `DELETE` | `/users/{id}` | Storypoints they created are kept |

use axum::{Json, extract::State, http::StatusCode};
use geobase_core::{
  blob::BlobStore,
  store::GeoStore,
  user::{NewUser, User, UserPatch},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{check_email, check_password, store_err, write_err};
use crate::{
  AppState,
  auth::password,
  error::{ApiError, JsonBody, PathParams},
  tenancy::Member,
};

#[derive(Debug, Serialize)]
pub struct UserSummary {
  pub id:       Uuid,
  pub fullname: String,
  pub email:    String,
}

impl From<User> for UserSummary {
  fn from(u: User) -> Self { Self { id: u.id, fullname: u.fullname, email: u.email } }
}

async fn require_user<S: GeoStore>(
  store: &S,
  company_id: Uuid,
  user_id: Uuid,
) -> Result<User, ApiError> {
  store
    .get_user(user_id)
    .await
    .map_err(store_err)?
    .filter(|u| u.company_id == company_id)
    .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

const EMAIL_TAKEN: &str = "Email already in use";

async fn ensure_email_free<S: GeoStore>(store: &S, email: &str) -> Result<(), ApiError> {
  if store.find_user_by_email(email).await.map_err(store_err)?.is_some() {
    return Err(ApiError::Conflict(EMAIL_TAKEN.into()));
  }
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /api/companies/{company_id}/users`
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let users: Vec<UserSummary> = state
    .store
    .list_users(member.company_id())
    .await
    .map_err(store_err)?
    .into_iter()
    .map(UserSummary::from)
    .collect();
  Ok(Json(json!({ "users": users })))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub fullname: String,
  pub email:    String,
  pub password: String,
}

/// `POST /api/companies/{company_id}/users`
pub async fn create<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  check_email(&state.config.validation, &body.email)?;
  check_password(&state.config.validation, &body.password)?;
  ensure_email_free(state.store.as_ref(), &body.email).await?;

  let password_hash = password::hash_blocking(body.password).await?;
  let user = state
    .store
    .add_user(NewUser {
      company_id: member.company_id(),
      fullname: body.fullname,
      email: body.email,
      password_hash,
    })
    .await
    .map_err(write_err(EMAIL_TAKEN))?;

  tracing::info!(company = %user.company_id, user = %user.id, by = %member.user_id(), "user added");
  Ok((StatusCode::CREATED, Json(json!({ "user_id": user.id }))))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/companies/{company_id}/users/{user_id}`
pub async fn get_one<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, user_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let user = require_user(state.store.as_ref(), member.company_id(), user_id).await?;
  Ok(Json(json!({ "user": UserSummary::from(user) })))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub fullname: Option<String>,
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `PUT /api/companies/{company_id}/users/{user_id}`
///
/// Empty strings count as absent.
pub async fn update<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, user_id)): PathParams<(Uuid, Uuid)>,
  JsonBody(body): JsonBody<UpdateBody>,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let mut user = require_user(state.store.as_ref(), member.company_id(), user_id).await?;

  let email = body.email.filter(|e| !e.is_empty());
  let new_password = body.password.filter(|p| !p.is_empty());

  if let Some(email) = &email {
    check_email(&state.config.validation, email)?;
  }
  if let Some(pw) = &new_password {
    check_password(&state.config.validation, pw)?;
  }
  if let Some(email) = &email
    && *email != user.email
  {
    ensure_email_free(state.store.as_ref(), email).await?;
  }

  let password_hash = match new_password {
    Some(pw) => Some(password::hash_blocking(pw).await?),
    None => None,
  };
  UserPatch { fullname: body.fullname, email, password_hash }.apply(&mut user);

  state.store.update_user(&user).await.map_err(write_err(EMAIL_TAKEN))?;
  tracing::info!(user = %user.id, by = %member.user_id(), "user updated");
  Ok(StatusCode::OK)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/companies/{company_id}/users/{user_id}`
pub async fn delete<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, user_id)): PathParams<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  if !state
    .store
    .delete_user(member.company_id(), user_id)
    .await
    .map_err(store_err)?
  {
    return Err(ApiError::NotFound("User not found".into()));
  }
  tracing::info!(user = %user_id, by = %member.user_id(), "user deleted");
  Ok(StatusCode::OK)
}

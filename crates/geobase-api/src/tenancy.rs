//! Tenancy Guard.
//!
//! [`Member`] is the extractor every company-scoped route starts with. It
//! runs the guard steps in a fixed order: authenticate the caller, resolve
//! the company named in the path, then check membership. Handlers only see
//! company data once all three have passed.

use std::collections::HashMap;

use axum::{
  extract::{FromRequestParts, Path},
  http::request::Parts,
};
use geobase_core::{blob::BlobStore, company::Company, store::GeoStore};
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError};

/// `true` iff a user with `user_id` exists and belongs to `company_id`.
///
/// Reads the user record, not the company's member list, which is only a
/// cache.
pub async fn is_member<S: GeoStore>(
  store: &S,
  user_id: Uuid,
  company_id: Uuid,
) -> Result<bool, S::Error> {
  Ok(
    store
      .get_user(user_id)
      .await?
      .is_some_and(|user| user.company_id == company_id),
  )
}

/// A caller that has been verified as a member of the company in the path.
#[derive(Debug, Clone)]
pub struct Member {
  pub caller:  Caller,
  pub company: Company,
}

impl Member {
  pub fn user_id(&self) -> Uuid { self.caller.user_id }

  pub fn company_id(&self) -> Uuid { self.company.id }
}

impl<S, B> FromRequestParts<AppState<S, B>> for Member
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, B>,
  ) -> Result<Self, Self::Rejection> {
    let caller = Caller::from_request_parts(parts, state).await?;

    let company_id = Path::<HashMap<String, String>>::from_request_parts(parts, state)
      .await
      .ok()
      .and_then(|Path(params)| params.get("company_id").and_then(|s| Uuid::parse_str(s).ok()))
      .ok_or_else(|| ApiError::NotFound("Company not found".into()))?;

    let company = state
      .store
      .get_company(company_id)
      .await
      .map_err(|e| ApiError::Internal(Box::new(e)))?
      .ok_or_else(|| ApiError::NotFound("Company not found".into()))?;

    let allowed = is_member(state.store.as_ref(), caller.user_id, company.id)
      .await
      .map_err(|e| ApiError::Internal(Box::new(e)))?;
    if !allowed {
      tracing::debug!(user = %caller.user_id, company = %company.id, "membership check failed");
      return Err(ApiError::Forbidden("User not part of company".into()));
    }

    Ok(Member { caller, company })
  }
}

#[cfg(test)]
mod tests {
  use geobase_core::{company::NewCompany, user::NewUser};
  use geobase_store_sqlite::SqliteStore;

  use super::*;

  async fn register(store: &SqliteStore, name: &str, email: &str) -> (Company, Uuid) {
    let (company, user) = store
      .register_company(
        NewCompany { name: name.into(), description: String::new() },
        NewUser {
          company_id:    Uuid::nil(),
          fullname:      "F".into(),
          email:         email.into(),
          password_hash: "x".into(),
        },
      )
      .await
      .unwrap();
    (company, user.id)
  }

  #[tokio::test]
  async fn member_of_own_company_only() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (alpha, alice) = register(&store, "Alpha", "alice@alpha.io").await;
    let (beta, bob) = register(&store, "Beta", "bob@beta.io").await;

    assert!(is_member(&store, alice, alpha.id).await.unwrap());
    assert!(is_member(&store, bob, beta.id).await.unwrap());
    assert!(!is_member(&store, alice, beta.id).await.unwrap());
    assert!(!is_member(&store, bob, alpha.id).await.unwrap());
  }

  #[tokio::test]
  async fn unknown_user_or_company_is_not_member() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (alpha, alice) = register(&store, "Alpha", "alice@alpha.io").await;

    assert!(!is_member(&store, Uuid::new_v4(), alpha.id).await.unwrap());
    assert!(!is_member(&store, alice, Uuid::new_v4()).await.unwrap());
  }

  #[tokio::test]
  async fn deleted_user_loses_membership() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (alpha, alice) = register(&store, "Alpha", "alice@alpha.io").await;

    store.delete_user(alpha.id, alice).await.unwrap();
    assert!(!is_member(&store, alice, alpha.id).await.unwrap());
  }
}

use axum::{extract::FromRequestParts, http::request::Parts};
use geobase_core::{blob::BlobStore, store::GeoStore};
use uuid::Uuid;

use super::{Claims, Error, token_from_headers};
use crate::{AppState, error::ApiError};

/// A verified caller. Extracting this is the first step of every
/// authenticated route: missing, malformed, expired and revoked tokens all
/// stop here with a 401.
#[derive(Debug, Clone)]
pub struct Caller {
  pub user_id: Uuid,
  pub claims:  Claims,
  /// The raw token, kept so logout can revoke exactly this string.
  pub token:   String,
}

impl<S, B> FromRequestParts<AppState<S, B>> for Caller
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, B>,
  ) -> Result<Self, Self::Rejection> {
    let token = token_from_headers(&parts.headers).ok_or(Error::Missing)?;
    let claims = state.tokens.verify(state.store.as_ref(), token).await?;
    Ok(Caller { user_id: claims.sub, token: token.to_string(), claims })
  }
}

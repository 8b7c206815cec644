//! Token Authority: HS256 session tokens plus the revocation list.
//!
//! Signing is stateless. Revocation lives in the store and is matched by the
//! token's exact string, so revoking one token leaves the user's other
//! sessions alone.

use std::collections::HashSet;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::{Duration, Utc};
use geobase_core::store::GeoStore;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Error;

/// The identity claim carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub:   Uuid,
  pub email: String,
  /// Unique per token, so two logins in the same second still yield
  /// distinct (and separately revocable) strings.
  pub jti:   Uuid,
  pub iat:   i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exp:   Option<i64>,
}

pub struct TokenAuthority {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Option<Duration>,
}

impl TokenAuthority {
  pub fn new(secret: &str, ttl_secs: Option<u64>) -> Self {
    // A ttl too large to represent is treated as no expiry at all.
    let ttl = ttl_secs.and_then(|s| i64::try_from(s).ok().and_then(Duration::try_seconds));

    let mut validation = Validation::new(Algorithm::HS256);
    if ttl.is_none() {
      validation.required_spec_claims = HashSet::new();
      validation.validate_exp = false;
    }

    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      validation,
      ttl,
    }
  }

  /// Sign a fresh token for `user_id`.
  pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
      sub:   user_id,
      email: email.to_string(),
      jti:   Uuid::new_v4(),
      iat:   now.timestamp(),
      exp:   self.ttl.and_then(|ttl| now.checked_add_signed(ttl)).map(|t| t.timestamp()),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(Error::Sign)
  }

  /// Check the signature (and expiry, when tokens carry one). Does not
  /// consult the revocation list; see [`verify`](Self::verify).
  pub fn decode(&self, token: &str) -> Result<Claims, Error> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(Error::Invalid)
  }

  /// Full verification: the token must be well-signed and absent from the
  /// revocation list.
  pub async fn verify<S: GeoStore>(&self, store: &S, token: &str) -> Result<Claims, Error> {
    if token.is_empty() {
      return Err(Error::Missing);
    }
    if store
      .is_token_revoked(token)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
    {
      return Err(Error::Revoked);
    }
    self.decode(token)
  }

  /// Add `token` to the revocation list. Revoking twice is a no-op.
  pub async fn revoke<S: GeoStore>(&self, store: &S, token: &str) -> Result<(), Error> {
    store
      .revoke_token(token)
      .await
      .map_err(|e| Error::Store(Box::new(e)))
  }
}

/// Pull the token out of `Authorization`. Both `Bearer <token>` and a bare
/// token are accepted.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
  let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
  (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;
  use geobase_store_sqlite::SqliteStore;

  use super::*;

  fn authority() -> TokenAuthority { TokenAuthority::new("test-secret", Some(3600)) }

  #[test]
  fn issue_then_decode_round_trips_claims() {
    let ta = authority();
    let user = Uuid::new_v4();
    let token = ta.issue(user, "a@alpha.io").unwrap();

    let claims = ta.decode(&token).unwrap();
    assert_eq!(claims.sub, user);
    assert_eq!(claims.email, "a@alpha.io");
    assert!(claims.exp.is_some());
  }

  #[test]
  fn tokens_are_distinct_per_issue() {
    let ta = authority();
    let user = Uuid::new_v4();
    assert_ne!(ta.issue(user, "a@x.io").unwrap(), ta.issue(user, "a@x.io").unwrap());
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = authority().issue(Uuid::new_v4(), "a@x.io").unwrap();
    let other = TokenAuthority::new("other-secret", Some(3600));
    assert!(matches!(other.decode(&token), Err(Error::Invalid(_))));
  }

  #[test]
  fn tampered_token_is_rejected() {
    let ta = authority();
    let mut token = ta.issue(Uuid::new_v4(), "a@x.io").unwrap();
    token.push('x');
    assert!(ta.decode(&token).is_err());
  }

  #[test]
  fn tokens_without_ttl_have_no_expiry() {
    let ta = TokenAuthority::new("s", None);
    let token = ta.issue(Uuid::new_v4(), "a@x.io").unwrap();
    let claims = ta.decode(&token).unwrap();
    assert_eq!(claims.exp, None);
  }

  #[test]
  fn expired_token_is_rejected() {
    let ta = authority();
    let now = Utc::now().timestamp();
    let claims = Claims {
      sub:   Uuid::new_v4(),
      email: "a@x.io".into(),
      jti:   Uuid::new_v4(),
      iat:   now - 7200,
      exp:   Some(now - 3600),
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &ta.encoding).unwrap();
    assert!(ta.decode(&token).is_err());
  }

  #[tokio::test]
  async fn verify_fails_after_revoke_only_for_that_token() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let ta = authority();
    let user = Uuid::new_v4();
    let t1 = ta.issue(user, "a@x.io").unwrap();
    let t2 = ta.issue(user, "a@x.io").unwrap();

    assert!(ta.verify(&store, &t1).await.is_ok());

    ta.revoke(&store, &t1).await.unwrap();
    ta.revoke(&store, &t1).await.unwrap();

    assert!(matches!(ta.verify(&store, &t1).await, Err(Error::Revoked)));
    assert!(ta.verify(&store, &t2).await.is_ok());
  }

  #[tokio::test]
  async fn verify_empty_token_is_missing() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(matches!(authority().verify(&store, "").await, Err(Error::Missing)));
  }

  #[test]
  fn header_parsing_accepts_bearer_and_bare() {
    let mut headers = HeaderMap::new();
    assert_eq!(token_from_headers(&headers), None);

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
    assert_eq!(token_from_headers(&headers), Some("abc.def"));

    headers.insert(AUTHORIZATION, HeaderValue::from_static("abc.def"));
    assert_eq!(token_from_headers(&headers), Some("abc.def"));

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert_eq!(token_from_headers(&headers), None);
  }
}

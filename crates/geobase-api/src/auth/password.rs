//! Credential Store: argon2 password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use rand_core::OsRng;

use crate::error::ApiError;

/// Hash `plaintext` with a fresh random salt into a PHC string.
pub fn hash(plaintext: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(plaintext.as_bytes(), &salt)?.to_string())
}

/// `true` iff `plaintext` matches `digest`. A digest that does not parse
/// counts as a mismatch and is logged.
pub fn verify(plaintext: &str, digest: &str) -> bool {
  let parsed = match PasswordHash::new(digest) {
    Ok(parsed) => parsed,
    Err(e) => {
      tracing::warn!(error = %e, "stored password hash is malformed");
      return false;
    }
  };
  match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
    Ok(()) => true,
    Err(password_hash::Error::Password) => false,
    Err(e) => {
      tracing::warn!(error = %e, "password verification failed");
      false
    }
  }
}

// argon2 is deliberately slow; keep it off the async workers.

pub async fn hash_blocking(plaintext: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || hash(&plaintext))
    .await
    .map_err(ApiError::internal)?
    .map_err(|e| ApiError::internal(e.to_string()))
}

pub async fn verify_blocking(plaintext: String, digest: String) -> Result<bool, ApiError> {
  tokio::task::spawn_blocking(move || verify(&plaintext, &digest))
    .await
    .map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_verifies_and_is_salted() {
    let a = hash("Correct-Horse-9").unwrap();
    let b = hash("Correct-Horse-9").unwrap();
    assert_ne!(a, b);
    assert!(verify("Correct-Horse-9", &a));
    assert!(verify("Correct-Horse-9", &b));
  }

  #[test]
  fn wrong_password_does_not_verify() {
    let digest = hash("Correct-Horse-9").unwrap();
    assert!(!verify("correct-horse-9", &digest));
    assert!(!verify("", &digest));
  }

  #[test]
  fn malformed_digest_is_a_mismatch() {
    assert!(!verify("anything", "not-a-phc-string"));
    assert!(!verify("anything", ""));
  }

  #[tokio::test]
  async fn blocking_wrappers_agree() {
    let digest = hash_blocking("S3cret!pw".into()).await.unwrap();
    assert!(verify_blocking("S3cret!pw".into(), digest.clone()).await.unwrap());
    assert!(!verify_blocking("nope".into(), digest).await.unwrap());
  }
}

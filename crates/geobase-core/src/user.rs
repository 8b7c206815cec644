//! User: a member of exactly one company.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored user record.
///
/// Not `Serialize`: the password hash must never reach the wire. The API layer
/// projects users into its own response types.
#[derive(Debug, Clone)]
pub struct User {
  pub id:            Uuid,
  pub fullname:      String,
  /// Globally unique; login carries no company context.
  pub email:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
  pub company_id:    Uuid,
}

/// Input for creating a user inside an existing company.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub company_id:    Uuid,
  pub fullname:      String,
  pub email:         String,
  pub password_hash: String,
}

/// Partial update for a user. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
  pub fullname:      Option<String>,
  pub email:         Option<String>,
  pub password_hash: Option<String>,
}

impl UserPatch {
  /// Apply the patch in place. Empty names are ignored.
  pub fn apply(self, user: &mut User) {
    if let Some(fullname) = self.fullname.filter(|f| !f.is_empty()) {
      user.fullname = fullname;
    }
    if let Some(email) = self.email {
      user.email = email;
    }
    if let Some(hash) = self.password_hash {
      user.password_hash = hash;
    }
  }
}

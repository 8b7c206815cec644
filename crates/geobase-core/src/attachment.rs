//! Attachment: metadata for a binary file hung off a storypoint.
//!
//! The bytes themselves live in a [`BlobStore`](crate::blob::BlobStore) under
//! the attachment id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
  pub id:            Uuid,
  /// Unique within `storypoint_id`.
  pub filename:      String,
  pub company_id:    Uuid,
  pub storypoint_id: Uuid,
  pub created_by:    Uuid,
  pub size:          u64,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub created_at:    DateTime<Utc>,
}

/// Input for [`GeoStore::add_attachment`](crate::store::GeoStore::add_attachment).
///
/// The id is chosen by the caller because the blob is written before the
/// metadata record exists.
#[derive(Debug, Clone)]
pub struct NewAttachment {
  pub id:            Uuid,
  pub filename:      String,
  pub company_id:    Uuid,
  pub storypoint_id: Uuid,
  pub created_by:    Uuid,
  pub size:          u64,
}

impl Attachment {
  /// Case-insensitive suffix check against an allow-list such as
  /// `[".png", ".jpg"]`.
  pub fn has_extension_in(&self, endings: &[String]) -> bool {
    let name = self.filename.to_lowercase();
    endings.iter().any(|e| name.ends_with(&e.to_lowercase()))
  }
}

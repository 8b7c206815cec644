//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Id lists and history are compact JSON.

use chrono::{DateTime, Utc};
use geobase_core::{
  attachment::Attachment,
  company::Company,
  geo::Coords,
  storypoint::Storypoint,
  user::User,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_uuid_list(s: &str) -> Result<Vec<Uuid>> {
  let raw: Vec<String> = serde_json::from_str(s)?;
  raw.iter().map(|s| decode_uuid(s)).collect()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── History ──────────────────────────────────────────────────────────────────

pub fn encode_history(history: &[Value]) -> Result<String> {
  Ok(serde_json::to_string(history)?)
}

pub fn decode_history(s: &str) -> Result<Vec<Value>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const COMPANY_COLUMNS: &str =
  "company_id, name, description, created_at, member_user_ids, storypoint_ids";

/// Raw strings read directly from a `companies` row.
pub struct RawCompany {
  pub company_id:      String,
  pub name:            String,
  pub description:     String,
  pub created_at:      String,
  pub member_user_ids: String,
  pub storypoint_ids:  String,
}

impl RawCompany {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      company_id:      row.get(0)?,
      name:            row.get(1)?,
      description:     row.get(2)?,
      created_at:      row.get(3)?,
      member_user_ids: row.get(4)?,
      storypoint_ids:  row.get(5)?,
    })
  }

  pub fn into_company(self) -> Result<Company> {
    Ok(Company {
      id:              decode_uuid(&self.company_id)?,
      name:            self.name,
      description:     self.description,
      created_at:      decode_dt(&self.created_at)?,
      member_user_ids: decode_uuid_list(&self.member_user_ids)?,
      storypoint_ids:  decode_uuid_list(&self.storypoint_ids)?,
    })
  }
}

pub const USER_COLUMNS: &str =
  "user_id, company_id, fullname, email, password_hash, created_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub company_id:    String,
  pub fullname:      String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      company_id:    row.get(1)?,
      fullname:      row.get(2)?,
      email:         row.get(3)?,
      password_hash: row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            decode_uuid(&self.user_id)?,
      company_id:    decode_uuid(&self.company_id)?,
      fullname:      self.fullname,
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const STORYPOINT_COLUMNS: &str = "storypoint_id, company_id, created_by, lat, lon, \
                                      title, description, history, file_ids, created_at";

/// Raw values read directly from a `storypoints` row.
pub struct RawStorypoint {
  pub storypoint_id: String,
  pub company_id:    String,
  pub created_by:    String,
  pub lat:           f64,
  pub lon:           f64,
  pub title:         String,
  pub description:   String,
  pub history:       String,
  pub file_ids:      String,
  pub created_at:    String,
}

impl RawStorypoint {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      storypoint_id: row.get(0)?,
      company_id:    row.get(1)?,
      created_by:    row.get(2)?,
      lat:           row.get(3)?,
      lon:           row.get(4)?,
      title:         row.get(5)?,
      description:   row.get(6)?,
      history:       row.get(7)?,
      file_ids:      row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_storypoint(self) -> Result<Storypoint> {
    Ok(Storypoint {
      id:          decode_uuid(&self.storypoint_id)?,
      company_id:  decode_uuid(&self.company_id)?,
      created_by:  decode_uuid(&self.created_by)?,
      coords:      Coords::new(self.lat, self.lon)?,
      title:       self.title,
      description: self.description,
      history:     decode_history(&self.history)?,
      file_ids:    decode_uuid_list(&self.file_ids)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const ATTACHMENT_COLUMNS: &str =
  "attachment_id, storypoint_id, company_id, created_by, filename, size, created_at";

/// Raw values read directly from an `attachments` row.
pub struct RawAttachment {
  pub attachment_id: String,
  pub storypoint_id: String,
  pub company_id:    String,
  pub created_by:    String,
  pub filename:      String,
  pub size:          i64,
  pub created_at:    String,
}

impl RawAttachment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attachment_id: row.get(0)?,
      storypoint_id: row.get(1)?,
      company_id:    row.get(2)?,
      created_by:    row.get(3)?,
      filename:      row.get(4)?,
      size:          row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      id:            decode_uuid(&self.attachment_id)?,
      storypoint_id: decode_uuid(&self.storypoint_id)?,
      company_id:    decode_uuid(&self.company_id)?,
      created_by:    decode_uuid(&self.created_by)?,
      filename:      self.filename,
      size:          self.size.max(0) as u64,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

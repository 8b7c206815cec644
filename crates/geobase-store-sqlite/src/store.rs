//! [`SqliteStore`]: the SQLite implementation of [`GeoStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use geobase_core::{
  attachment::{Attachment, NewAttachment},
  company::{Company, NewCompany},
  geo::Coords,
  store::GeoStore,
  storypoint::{NewStorypoint, Storypoint},
  user::{NewUser, User},
};

use crate::{
  Result,
  encode::{
    ATTACHMENT_COLUMNS, COMPANY_COLUMNS, RawAttachment, RawCompany, RawStorypoint, RawUser,
    STORYPOINT_COLUMNS, USER_COLUMNS, decode_uuid, encode_dt, encode_history, encode_uuid,
  },
  schema::SCHEMA,
};

// Append `?1` to / remove `?1` from a JSON id array column of the row matched
// by `?2`.
const PUSH_MEMBER: &str = "UPDATE companies
   SET member_user_ids = json_insert(member_user_ids, '$[#]', ?1)
   WHERE company_id = ?2";
const PULL_MEMBER: &str = "UPDATE companies
   SET member_user_ids = (SELECT json_group_array(value)
                          FROM json_each(companies.member_user_ids) WHERE value != ?1)
   WHERE company_id = ?2";
const PUSH_STORYPOINT: &str = "UPDATE companies
   SET storypoint_ids = json_insert(storypoint_ids, '$[#]', ?1)
   WHERE company_id = ?2";
const PULL_STORYPOINT: &str = "UPDATE companies
   SET storypoint_ids = (SELECT json_group_array(value)
                         FROM json_each(companies.storypoint_ids) WHERE value != ?1)
   WHERE company_id = ?2";
const PUSH_FILE: &str = "UPDATE storypoints
   SET file_ids = json_insert(file_ids, '$[#]', ?1)
   WHERE storypoint_id = ?2";
const PULL_FILE: &str = "UPDATE storypoints
   SET file_ids = (SELECT json_group_array(value)
                   FROM json_each(storypoints.file_ids) WHERE value != ?1)
   WHERE storypoint_id = ?2";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A GeoBase store backed by a single SQLite file.
///
/// Writes that touch a record and a reverse-index column run in one
/// transaction. Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema initialised");
    Ok(())
  }

  async fn query_user(&self, sql: String, param: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn query_company(&self, sql: String, param: String) -> Result<Option<Company>> {
    let raw: Option<RawCompany> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawCompany::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCompany::into_company).transpose()
  }
}

// ─── GeoStore impl ───────────────────────────────────────────────────────────

impl GeoStore for SqliteStore {
  type Error = crate::Error;

  // ── Companies ─────────────────────────────────────────────────────────────

  async fn register_company(
    &self,
    company: NewCompany,
    founder: NewUser,
  ) -> Result<(Company, User)> {
    let now = Utc::now();
    let company = Company {
      id:              Uuid::new_v4(),
      name:            company.name,
      description:     company.description,
      created_at:      now,
      member_user_ids: vec![],
      storypoint_ids:  vec![],
    };
    let user = User {
      id:            Uuid::new_v4(),
      company_id:    company.id,
      fullname:      founder.fullname,
      email:         founder.email,
      password_hash: founder.password_hash,
      created_at:    now,
    };

    let company_id = encode_uuid(company.id);
    let user_id    = encode_uuid(user.id);
    let at         = encode_dt(now);
    let name       = company.name.clone();
    let desc       = company.description.clone();
    let fullname   = user.fullname.clone();
    let email      = user.email.clone();
    let hash       = user.password_hash.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO companies (company_id, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![company_id, name, desc, at],
        )?;
        tx.execute(
          "INSERT INTO users (user_id, company_id, fullname, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![user_id, company_id, fullname, email, hash, at],
        )?;
        tx.execute(PUSH_MEMBER, rusqlite::params![user_id, company_id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    let company = Company { member_user_ids: vec![user.id], ..company };
    Ok((company, user))
  }

  async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
    self
      .query_company(
        format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE company_id = ?1"),
        encode_uuid(id),
      )
      .await
  }

  async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
    self
      .query_company(
        format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE name = ?1"),
        name.to_owned(),
      )
      .await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self
      .query_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        encode_uuid(id),
      )
      .await
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    self
      .query_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        email.to_owned(),
      )
      .await
  }

  async fn list_users(&self, company_id: Uuid) -> Result<Vec<User>> {
    let company_id = encode_uuid(company_id);

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE company_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_id], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      id:            Uuid::new_v4(),
      company_id:    input.company_id,
      fullname:      input.fullname,
      email:         input.email,
      password_hash: input.password_hash,
      created_at:    Utc::now(),
    };

    let user_id    = encode_uuid(user.id);
    let company_id = encode_uuid(user.company_id);
    let fullname   = user.fullname.clone();
    let email      = user.email.clone();
    let hash       = user.password_hash.clone();
    let at         = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO users (user_id, company_id, fullname, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![user_id, company_id, fullname, email, hash, at],
        )?;
        tx.execute(PUSH_MEMBER, rusqlite::params![user_id, company_id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn update_user(&self, user: &User) -> Result<()> {
    let user_id  = encode_uuid(user.id);
    let fullname = user.fullname.clone();
    let email    = user.email.clone();
    let hash     = user.password_hash.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET fullname = ?1, email = ?2, password_hash = ?3 WHERE user_id = ?4",
          rusqlite::params![fullname, email, hash, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_user(&self, company_id: Uuid, user_id: Uuid) -> Result<bool> {
    let company_id = encode_uuid(company_id);
    let user_id    = encode_uuid(user_id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "DELETE FROM users WHERE user_id = ?1 AND company_id = ?2",
          rusqlite::params![user_id, company_id],
        )?;
        if n > 0 {
          tx.execute(PULL_MEMBER, rusqlite::params![user_id, company_id])?;
        }
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }

  // ── Storypoints ───────────────────────────────────────────────────────────

  async fn list_storypoints(&self, company_id: Uuid) -> Result<Vec<Storypoint>> {
    let company_id = encode_uuid(company_id);

    let raws: Vec<RawStorypoint> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STORYPOINT_COLUMNS} FROM storypoints WHERE company_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_id], RawStorypoint::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStorypoint::into_storypoint).collect()
  }

  async fn get_storypoint(&self, company_id: Uuid, id: Uuid) -> Result<Option<Storypoint>> {
    let company_id = encode_uuid(company_id);
    let id         = encode_uuid(id);

    let raw: Option<RawStorypoint> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {STORYPOINT_COLUMNS} FROM storypoints
                 WHERE storypoint_id = ?1 AND company_id = ?2"
              ),
              rusqlite::params![id, company_id],
              RawStorypoint::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStorypoint::into_storypoint).transpose()
  }

  async fn find_storypoint_at(
    &self,
    company_id: Uuid,
    coords: Coords,
  ) -> Result<Option<Storypoint>> {
    let company_id = encode_uuid(company_id);

    let raw: Option<RawStorypoint> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {STORYPOINT_COLUMNS} FROM storypoints
                 WHERE company_id = ?1 AND lat = ?2 AND lon = ?3"
              ),
              rusqlite::params![company_id, coords.lat, coords.lon],
              RawStorypoint::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStorypoint::into_storypoint).transpose()
  }

  async fn add_storypoint(&self, input: NewStorypoint) -> Result<Storypoint> {
    let sp = Storypoint {
      id:          Uuid::new_v4(),
      company_id:  input.company_id,
      created_by:  input.created_by,
      coords:      input.coords,
      title:       input.title,
      description: input.description,
      history:     vec![],
      file_ids:    vec![],
      created_at:  Utc::now(),
    };

    let id         = encode_uuid(sp.id);
    let company_id = encode_uuid(sp.company_id);
    let created_by = encode_uuid(sp.created_by);
    let (lat, lon) = (sp.coords.lat, sp.coords.lon);
    let title      = sp.title.clone();
    let desc       = sp.description.clone();
    let at         = encode_dt(sp.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO storypoints
             (storypoint_id, company_id, created_by, lat, lon, title, description, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![id, company_id, created_by, lat, lon, title, desc, at],
        )?;
        tx.execute(PUSH_STORYPOINT, rusqlite::params![id, company_id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(sp)
  }

  async fn update_storypoint(&self, sp: &Storypoint) -> Result<()> {
    let id         = encode_uuid(sp.id);
    let company_id = encode_uuid(sp.company_id);
    let (lat, lon) = (sp.coords.lat, sp.coords.lon);
    let title      = sp.title.clone();
    let desc       = sp.description.clone();
    let history    = encode_history(&sp.history)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE storypoints
           SET title = ?1, description = ?2, lat = ?3, lon = ?4, history = ?5
           WHERE storypoint_id = ?6 AND company_id = ?7",
          rusqlite::params![title, desc, lat, lon, history, id, company_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_storypoint(&self, company_id: Uuid, id: Uuid) -> Result<Option<Vec<Uuid>>> {
    let company_id = encode_uuid(company_id);
    let id         = encode_uuid(id);

    let removed: Option<Vec<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM storypoints WHERE storypoint_id = ?1 AND company_id = ?2",
            rusqlite::params![id, company_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }

        let attachment_ids = {
          let mut stmt =
            tx.prepare("SELECT attachment_id FROM attachments WHERE storypoint_id = ?1")?;
          stmt
            .query_map(rusqlite::params![id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        tx.execute("DELETE FROM attachments WHERE storypoint_id = ?1", rusqlite::params![id])?;
        tx.execute("DELETE FROM storypoints WHERE storypoint_id = ?1", rusqlite::params![id])?;
        tx.execute(PULL_STORYPOINT, rusqlite::params![id, company_id])?;
        tx.commit()?;
        Ok(Some(attachment_ids))
      })
      .await?;

    removed
      .map(|ids| ids.iter().map(|s| decode_uuid(s)).collect())
      .transpose()
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn list_attachments(&self, storypoint_id: Uuid) -> Result<Vec<Attachment>> {
    let storypoint_id = encode_uuid(storypoint_id);

    let raws: Vec<RawAttachment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE storypoint_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![storypoint_id], RawAttachment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttachment::into_attachment).collect()
  }

  async fn get_attachment(&self, id: Uuid) -> Result<Option<Attachment>> {
    let id = encode_uuid(id);

    let raw: Option<RawAttachment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE attachment_id = ?1"),
              rusqlite::params![id],
              RawAttachment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttachment::into_attachment).transpose()
  }

  async fn find_attachment(
    &self,
    company_id: Uuid,
    storypoint_id: Uuid,
    id: Uuid,
  ) -> Result<Option<Attachment>> {
    let company_id    = encode_uuid(company_id);
    let storypoint_id = encode_uuid(storypoint_id);
    let id            = encode_uuid(id);

    let raw: Option<RawAttachment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTACHMENT_COLUMNS} FROM attachments
                 WHERE attachment_id = ?1 AND storypoint_id = ?2 AND company_id = ?3"
              ),
              rusqlite::params![id, storypoint_id, company_id],
              RawAttachment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttachment::into_attachment).transpose()
  }

  async fn find_attachment_by_name(
    &self,
    storypoint_id: Uuid,
    filename: &str,
  ) -> Result<Option<Attachment>> {
    let storypoint_id = encode_uuid(storypoint_id);
    let filename      = filename.to_owned();

    let raw: Option<RawAttachment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTACHMENT_COLUMNS} FROM attachments
                 WHERE storypoint_id = ?1 AND filename = ?2"
              ),
              rusqlite::params![storypoint_id, filename],
              RawAttachment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttachment::into_attachment).transpose()
  }

  async fn add_attachment(&self, input: NewAttachment) -> Result<Attachment> {
    let attachment = Attachment {
      id:            input.id,
      filename:      input.filename,
      company_id:    input.company_id,
      storypoint_id: input.storypoint_id,
      created_by:    input.created_by,
      size:          input.size,
      created_at:    Utc::now(),
    };

    let id            = encode_uuid(attachment.id);
    let storypoint_id = encode_uuid(attachment.storypoint_id);
    let company_id    = encode_uuid(attachment.company_id);
    let created_by    = encode_uuid(attachment.created_by);
    let filename      = attachment.filename.clone();
    let size          = i64::try_from(attachment.size).unwrap_or(i64::MAX);
    let at            = encode_dt(attachment.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO attachments
             (attachment_id, storypoint_id, company_id, created_by, filename, size, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id, storypoint_id, company_id, created_by, filename, size, at],
        )?;
        tx.execute(PUSH_FILE, rusqlite::params![id, storypoint_id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(attachment)
  }

  async fn rename_attachment(&self, id: Uuid, filename: &str) -> Result<()> {
    let id       = encode_uuid(id);
    let filename = filename.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE attachments SET filename = ?1 WHERE attachment_id = ?2",
          rusqlite::params![filename, id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_attachment(&self, storypoint_id: Uuid, id: Uuid) -> Result<bool> {
    let storypoint_id = encode_uuid(storypoint_id);
    let id            = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Drop the reference before the record so a reader never follows a
        // listed id to a missing attachment.
        tx.execute(PULL_FILE, rusqlite::params![id, storypoint_id])?;
        let n = tx.execute(
          "DELETE FROM attachments WHERE attachment_id = ?1 AND storypoint_id = ?2",
          rusqlite::params![id, storypoint_id],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }

  // ── Token revocation list ─────────────────────────────────────────────────

  async fn revoke_token(&self, token: &str) -> Result<()> {
    let token = token.to_owned();
    let at    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO revoked_tokens (token, revoked_at) VALUES (?1, ?2)",
          rusqlite::params![token, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn is_token_revoked(&self, token: &str) -> Result<bool> {
    let token = token.to_owned();

    let revoked = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM revoked_tokens WHERE token = ?1",
              rusqlite::params![token],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(revoked)
  }
}

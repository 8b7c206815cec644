//! Attachment Ledger handlers under
//! `/api/companies/{company_id}/storypoints/{storypoint_id}/files`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/files` | Metadata of every attachment |
//! | `POST`   | `/files?filename=` | Multipart field `file`; 409 on taken name, 400 over the size cap |
//! | `GET`    | `/files/archive` | Zip of all attachments, named after the storypoint |
//! | `GET`    | `/files/{id}` | Raw bytes |
//! | `DELETE` | `/files/{id}` | |
//! | `GET`    | `/files/{id}/thumbnail` | PNG; images only |
//! | `PUT`    | `/files/{id}/rename` | Body: `{"filename":..}` |

use std::io;

use axum::{
  Json,
  body::Body,
  extract::{Multipart, State, multipart::MultipartRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt as _;
use geobase_core::{
  attachment::{Attachment, NewAttachment},
  blob::BlobStore,
  store::GeoStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt as _;
use tokio_util::io::{ReaderStream, StreamReader};
use uuid::Uuid;

use super::{check_filename, require_storypoint, store_err, write_err};
use crate::{
  AppState, archive,
  error::{ApiError, JsonBody, PathParams, QueryParams},
  tenancy::Member,
  thumbnail,
};

const NAME_TAKEN: &str = "File with that name already exists at the specified storypoint";

#[derive(Debug, Serialize)]
pub struct FileEntry {
  pub id:         Uuid,
  pub filename:   String,
  pub created_by: Uuid,
  pub size:       u64,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub created_at: DateTime<Utc>,
}

impl From<Attachment> for FileEntry {
  fn from(a: Attachment) -> Self {
    Self {
      id:         a.id,
      filename:   a.filename,
      created_by: a.created_by,
      size:       a.size,
      created_at: a.created_at,
    }
  }
}

/// Resolve the storypoint, then the attachment underneath it.
async fn require_attachment<S: GeoStore>(
  store: &S,
  company_id: Uuid,
  storypoint_id: Uuid,
  file_id: Uuid,
) -> Result<Attachment, ApiError> {
  require_storypoint(store, company_id, storypoint_id).await?;
  store
    .find_attachment(company_id, storypoint_id, file_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("File not found at this storypoint".into()))
}

fn attachment_disposition(filename: &str) -> HeaderValue {
  let safe: String = filename
    .chars()
    .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
    .collect();
  HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET .../files`
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let sp = require_storypoint(state.store.as_ref(), member.company_id(), storypoint_id).await?;
  let files: Vec<FileEntry> = state
    .store
    .list_attachments(sp.id)
    .await
    .map_err(store_err)?
    .into_iter()
    .map(FileEntry::from)
    .collect();
  Ok(Json(json!({ "files": files })))
}

// ─── Upload ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename: Option<String>,
}

/// `POST .../files?filename=<name>`
///
/// The blob is written first under a fresh id and the metadata record
/// second; if the record cannot be written the blob is removed again.
pub async fn upload<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id)): PathParams<(Uuid, Uuid)>,
  QueryParams(params): QueryParams<UploadParams>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let sp = require_storypoint(state.store.as_ref(), member.company_id(), storypoint_id).await?;

  let filename = params
    .filename
    .ok_or_else(|| ApiError::InvalidInput("Filename must be a string".into()))?;
  check_filename(&state.config.validation, &filename)?;

  if state
    .store
    .find_attachment_by_name(sp.id, &filename)
    .await
    .map_err(store_err)?
    .is_some()
  {
    return Err(ApiError::Conflict(NAME_TAKEN.into()));
  }

  let mut multipart = multipart.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
  let field = loop {
    match multipart
      .next_field()
      .await
      .map_err(|e| ApiError::InvalidInput(e.body_text()))?
    {
      Some(field) if field.name() == Some("file") => break field,
      Some(_) => continue,
      None => return Err(ApiError::InvalidInput("Missing multipart field `file`".into())),
    }
  };

  // Read one byte past the cap so an oversized upload is detectable without
  // buffering it.
  let max = state.config.files.max_upload_bytes;
  let reader =
    StreamReader::new(Box::pin(field.map_err(io::Error::other))).take(max.saturating_add(1));

  let file_id = Uuid::new_v4();
  let size = state.blobs.write(file_id, reader).await.map_err(store_err)?;

  if size > max {
    if let Err(e) = state.blobs.delete(file_id).await {
      tracing::warn!(file = %file_id, error = %e, "failed to discard oversized upload");
    }
    return Err(ApiError::TooLarge("File too large".into()));
  }

  let record = NewAttachment {
    id: file_id,
    filename,
    company_id: member.company_id(),
    storypoint_id: sp.id,
    created_by: member.user_id(),
    size,
  };
  let attachment = match state.store.add_attachment(record).await {
    Ok(attachment) => attachment,
    Err(e) => {
      if let Err(blob_err) = state.blobs.delete(file_id).await {
        tracing::warn!(file = %file_id, error = %blob_err, "failed to discard orphaned upload");
      }
      return Err(write_err(NAME_TAKEN)(e));
    }
  };

  tracing::info!(
    storypoint = %sp.id,
    file = %attachment.id,
    bytes = attachment.size,
    "file uploaded"
  );
  Ok((StatusCode::CREATED, Json(json!({ "file_id": attachment.id }))))
}

// ─── Archive ──────────────────────────────────────────────────────────────────

/// `GET .../files/archive`
pub async fn archive<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Response, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let sp = require_storypoint(state.store.as_ref(), member.company_id(), storypoint_id).await?;
  let attachments = state.store.list_attachments(sp.id).await.map_err(store_err)?;

  let mut entries = Vec::with_capacity(attachments.len());
  for attachment in attachments {
    match state.blobs.open(attachment.id).await.map_err(store_err)? {
      Some(reader) => entries.push((attachment.filename, reader)),
      None => {
        tracing::warn!(file = %attachment.id, "attachment has no blob; left out of archive");
      }
    }
  }

  let file = archive::build(
    entries,
    &state.config.temp_dir,
    state.config.files.archive_compression_level,
  )
  .await
  .map_err(ApiError::internal)?;

  let headers = [
    (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
    (header::CONTENT_DISPOSITION, attachment_disposition(&archive::archive_filename(&sp.title))),
  ];
  Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

// ─── Download ─────────────────────────────────────────────────────────────────

/// `GET .../files/{file_id}`
pub async fn download<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id, file_id)): PathParams<(Uuid, Uuid, Uuid)>,
) -> Result<Response, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let attachment =
    require_attachment(state.store.as_ref(), member.company_id(), storypoint_id, file_id).await?;

  let reader = state
    .blobs
    .open(attachment.id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| {
      tracing::error!(file = %attachment.id, "attachment record has no blob");
      ApiError::NotFound("File not found at this storypoint".into())
    })?;

  let headers = [
    (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
    (header::CONTENT_DISPOSITION, attachment_disposition(&attachment.filename)),
    (header::CONTENT_LENGTH, HeaderValue::from(attachment.size)),
  ];
  Ok((headers, Body::from_stream(ReaderStream::new(reader))).into_response())
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE .../files/{file_id}`
///
/// The record (and its entry in the storypoint's file list) goes first, so a
/// failure afterwards can only leave an unreferenced blob behind, never a
/// listed file that 404s.
pub async fn delete<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id, file_id)): PathParams<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let attachment =
    require_attachment(state.store.as_ref(), member.company_id(), storypoint_id, file_id).await?;

  if !state
    .store
    .delete_attachment(attachment.storypoint_id, attachment.id)
    .await
    .map_err(store_err)?
  {
    return Err(ApiError::NotFound("File not found at this storypoint".into()));
  }
  if let Err(e) = state.blobs.delete(attachment.id).await {
    tracing::warn!(file = %attachment.id, error = %e, "failed to delete attachment blob");
  }

  tracing::info!(storypoint = %storypoint_id, file = %file_id, "file deleted");
  Ok(StatusCode::OK)
}

// ─── Thumbnail ────────────────────────────────────────────────────────────────

/// `GET .../files/{file_id}/thumbnail`
pub async fn thumbnail<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id, file_id)): PathParams<(Uuid, Uuid, Uuid)>,
) -> Result<Response, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let attachment =
    require_attachment(state.store.as_ref(), member.company_id(), storypoint_id, file_id).await?;

  let files = &state.config.files;
  if !attachment.has_extension_in(&files.image_file_endings) {
    return Err(ApiError::InvalidInput("File is not an image type".into()));
  }

  let mut reader = state
    .blobs
    .open(attachment.id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("File not found at this storypoint".into()))?;
  let mut bytes = Vec::new();
  reader.read_to_end(&mut bytes).await.map_err(ApiError::internal)?;

  let png = thumbnail::render_blocking(bytes, files.thumbnail_width, files.thumbnail_height).await?;
  Ok(([(header::CONTENT_TYPE, HeaderValue::from_static("image/png"))], png).into_response())
}

// ─── Rename ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub filename: String,
}

/// `PUT .../files/{file_id}/rename`
pub async fn rename<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id, file_id)): PathParams<(Uuid, Uuid, Uuid)>,
  JsonBody(body): JsonBody<RenameBody>,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let attachment =
    require_attachment(state.store.as_ref(), member.company_id(), storypoint_id, file_id).await?;
  check_filename(&state.config.validation, &body.filename)?;

  if body.filename == attachment.filename {
    return Ok(StatusCode::OK);
  }
  if state
    .store
    .find_attachment_by_name(attachment.storypoint_id, &body.filename)
    .await
    .map_err(store_err)?
    .is_some()
  {
    return Err(ApiError::Conflict(NAME_TAKEN.into()));
  }

  state
    .store
    .rename_attachment(attachment.id, &body.filename)
    .await
    .map_err(write_err(NAME_TAKEN))?;
  tracing::info!(file = %attachment.id, filename = %body.filename, "file renamed");
  Ok(StatusCode::OK)
}

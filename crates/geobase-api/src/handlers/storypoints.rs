//! Handlers for `/api/companies/{company_id}/storypoints` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/storypoints` | `{id,title,coords}` per item |
//! | `POST`   | `/storypoints` | Body: `{"coords":[lat,lon],"title"?,"description"?}`; 409 on taken coords |
//! | `GET`    | `/storypoints/search?q=` | Fuzzy match, best first; 400 without `q` |
//! | `GET`    | `/storypoints/nearby?lat=&lng=` | Optional `limit`, `radius_km` overrides |
//! | `GET`    | `/storypoints/{id}` | Full record |
//! | `PUT`    | `/storypoints/{id}` | Partial update; empty strings are ignored |
//! | `DELETE` | `/storypoints/{id}` | Cascades to attachments |

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use geobase_core::{
  blob::BlobStore,
  geo::{self, Coords, NearbyOptions},
  search::{self, SearchOptions},
  store::GeoStore,
  storypoint::{NewStorypoint, Storypoint, StorypointPatch},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{require_storypoint, store_err, write_err};
use crate::{
  AppState,
  error::{ApiError, JsonBody, PathParams, QueryParams},
  tenancy::Member,
};

const COORDS_TAKEN: &str = "Storypoint with these coordinates already exists";

// ─── Views ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StorypointSummary {
  pub id:     Uuid,
  pub title:  String,
  pub coords: Coords,
}

impl From<&Storypoint> for StorypointSummary {
  fn from(sp: &Storypoint) -> Self {
    Self { id: sp.id, title: sp.title.clone(), coords: sp.coords }
  }
}

#[derive(Debug, Serialize)]
pub struct StorypointDetail {
  pub id:          Uuid,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub created_at:  DateTime<Utc>,
  pub created_by:  Uuid,
  pub title:       String,
  pub coords:      Coords,
  pub description: String,
  pub history:     Vec<Value>,
}

impl From<Storypoint> for StorypointDetail {
  fn from(sp: Storypoint) -> Self {
    Self {
      id:          sp.id,
      created_at:  sp.created_at,
      created_by:  sp.created_by,
      title:       sp.title,
      coords:      sp.coords,
      description: sp.description,
      history:     sp.history,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct NearbyEntry {
  pub id:          Uuid,
  pub title:       String,
  pub coords:      Coords,
  pub distance_km: f64,
  /// `"1.3 km"` or `"850 m"`.
  pub distance:    String,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /api/companies/{company_id}/storypoints`
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let storypoints = state
    .store
    .list_storypoints(member.company_id())
    .await
    .map_err(store_err)?;
  let items: Vec<StorypointSummary> = storypoints.iter().map(StorypointSummary::from).collect();
  Ok(Json(json!({ "storypoints": items })))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub coords:      Coords,
  pub title:       Option<String>,
  pub description: Option<String>,
}

/// `POST /api/companies/{company_id}/storypoints`
pub async fn create<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  if state
    .store
    .find_storypoint_at(member.company_id(), body.coords)
    .await
    .map_err(store_err)?
    .is_some()
  {
    return Err(ApiError::Conflict(COORDS_TAKEN.into()));
  }

  let input = NewStorypoint::new(
    member.company_id(),
    member.user_id(),
    body.coords,
    body.title,
    body.description,
  );
  let sp = state.store.add_storypoint(input).await.map_err(write_err(COORDS_TAKEN))?;
  tracing::info!(company = %sp.company_id, storypoint = %sp.id, "storypoint created");

  Ok((StatusCode::CREATED, Json(json!({ "storypoint_id": sp.id }))))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub q:     Option<String>,
  pub limit: Option<usize>,
}

/// `GET /api/companies/{company_id}/storypoints/search?q=<query>`
pub async fn search<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let query = params
    .q
    .filter(|q| !q.is_empty())
    .ok_or_else(|| ApiError::InvalidInput("Missing search query".into()))?;

  // The corpus is this company's storypoints and nothing else.
  let corpus = state
    .store
    .list_storypoints(member.company_id())
    .await
    .map_err(store_err)?;

  let options = SearchOptions {
    limit: params.limit.or(state.config.search.limit),
    ..state.config.search.clone()
  };
  let items: Vec<StorypointSummary> = search::search(&corpus, &query, &options)
    .into_iter()
    .map(|m| StorypointSummary::from(m.storypoint))
    .collect();
  Ok(Json(json!({ "storypoints": items })))
}

// ─── Nearby ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
  pub lat:       Option<f64>,
  pub lng:       Option<f64>,
  pub limit:     Option<usize>,
  pub radius_km: Option<f64>,
}

/// `GET /api/companies/{company_id}/storypoints/nearby?lat=<lat>&lng=<lng>`
pub async fn nearby<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  QueryParams(params): QueryParams<NearbyParams>,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
    return Err(ApiError::InvalidInput("Missing coordinates".into()));
  };
  let reference = Coords::new(lat, lng).map_err(|e| ApiError::InvalidInput(e.to_string()))?;

  let candidates = state
    .store
    .list_storypoints(member.company_id())
    .await
    .map_err(store_err)?;

  let defaults = state.config.nearby;
  let options = NearbyOptions {
    limit:     params.limit.unwrap_or(defaults.limit),
    radius_km: params.radius_km.unwrap_or(defaults.radius_km),
  };
  let items: Vec<NearbyEntry> = geo::nearby(reference, &candidates, options)
    .into_iter()
    .map(|r| NearbyEntry {
      id:          r.item.id,
      title:       r.item.title.clone(),
      coords:      r.item.coords,
      distance_km: r.distance_km,
      distance:    r.distance_label,
    })
    .collect();
  Ok(Json(json!({ "storypoints": items })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/companies/{company_id}/storypoints/{storypoint_id}`
pub async fn get_one<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let sp = require_storypoint(state.store.as_ref(), member.company_id(), storypoint_id).await?;
  Ok(Json(json!({ "storypoint": StorypointDetail::from(sp) })))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /api/companies/{company_id}/storypoints/{storypoint_id}`
pub async fn update<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id)): PathParams<(Uuid, Uuid)>,
  JsonBody(patch): JsonBody<StorypointPatch>,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let mut sp =
    require_storypoint(state.store.as_ref(), member.company_id(), storypoint_id).await?;

  if let Some(coords) = patch.coords
    && coords != sp.coords
    && let Some(other) = state
      .store
      .find_storypoint_at(member.company_id(), coords)
      .await
      .map_err(store_err)?
    && other.id != sp.id
  {
    return Err(ApiError::Conflict(COORDS_TAKEN.into()));
  }

  patch.apply(&mut sp);
  state.store.update_storypoint(&sp).await.map_err(write_err(COORDS_TAKEN))?;
  tracing::info!(storypoint = %sp.id, "storypoint updated");
  Ok(StatusCode::OK)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/companies/{company_id}/storypoints/{storypoint_id}`
///
/// Attachment records go with the storypoint in one store operation; their
/// blobs are removed afterwards. A blob that fails to delete is logged and
/// left behind as an orphan.
pub async fn delete<S, B>(
  State(state): State<AppState<S, B>>,
  member: Member,
  PathParams((_, storypoint_id)): PathParams<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let removed = state
    .store
    .delete_storypoint(member.company_id(), storypoint_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("Storypoint not found".into()))?;

  for file_id in &removed {
    if let Err(e) = state.blobs.delete(*file_id).await {
      tracing::warn!(file = %file_id, error = %e, "failed to delete attachment blob");
    }
  }
  tracing::info!(storypoint = %storypoint_id, files = removed.len(), "storypoint deleted");
  Ok(StatusCode::OK)
}

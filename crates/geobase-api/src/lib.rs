//! HTTP surface of GeoBase.
//!
//! Exposes an axum [`Router`] backed by any [`GeoStore`] and [`BlobStore`].
//! Every company-scoped route goes through the same guard pipeline,
//! expressed as extractors: [`auth::Caller`] authenticates,
//! [`tenancy::Member`] resolves the company and checks membership, and only
//! then does the handler look up resources, validate input and write.

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod tenancy;
pub mod thumbnail;

pub use config::ServerConfig;
pub use error::ApiError;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use geobase_core::{blob::BlobStore, store::GeoStore};

use auth::TokenAuthority;
use handlers::{companies, files, session, storypoints, users};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, B> {
  pub store:  Arc<S>,
  pub blobs:  Arc<B>,
  pub config: Arc<ServerConfig>,
  pub tokens: Arc<TokenAuthority>,
}

impl<S, B> AppState<S, B> {
  pub fn new(store: S, blobs: B, config: ServerConfig) -> Self {
    let tokens = TokenAuthority::new(&config.jwt_secret, config.token_ttl_secs);
    Self {
      store:  Arc::new(store),
      blobs:  Arc::new(blobs),
      config: Arc::new(config),
      tokens: Arc::new(tokens),
    }
  }
}

impl<S, B> Clone for AppState<S, B> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      blobs:  Arc::clone(&self.blobs),
      config: Arc::clone(&self.config),
      tokens: Arc::clone(&self.tokens),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

// Room for the multipart framing and the other form fields around the file.
const UPLOAD_BODY_SLACK: u64 = 1024 * 1024;

/// Build the GeoBase router with every route under `/api`.
pub fn router<S, B>(state: AppState<S, B>) -> Router
where
  S: GeoStore + 'static,
  B: BlobStore + 'static,
{
  let upload_limit =
    usize::try_from(state.config.files.max_upload_bytes.saturating_add(UPLOAD_BODY_SLACK))
      .unwrap_or(usize::MAX);

  let storypoint_files = "/api/companies/{company_id}/storypoints/{storypoint_id}/files";

  Router::new()
    // Session
    .route("/api/login", post(session::login::<S, B>))
    .route("/api/logout", post(session::logout::<S, B>))
    .route("/api/user", get(session::profile::<S, B>))
    // Companies
    .route("/api/companies", post(companies::register::<S, B>))
    // Storypoints
    .route(
      "/api/companies/{company_id}/storypoints",
      get(storypoints::list::<S, B>).post(storypoints::create::<S, B>),
    )
    .route("/api/companies/{company_id}/storypoints/search", get(storypoints::search::<S, B>))
    .route("/api/companies/{company_id}/storypoints/nearby", get(storypoints::nearby::<S, B>))
    .route(
      "/api/companies/{company_id}/storypoints/{storypoint_id}",
      get(storypoints::get_one::<S, B>)
        .put(storypoints::update::<S, B>)
        .delete(storypoints::delete::<S, B>),
    )
    // Users
    .route(
      "/api/companies/{company_id}/users",
      get(users::list::<S, B>).post(users::create::<S, B>),
    )
    .route(
      "/api/companies/{company_id}/users/{user_id}",
      get(users::get_one::<S, B>)
        .put(users::update::<S, B>)
        .delete(users::delete::<S, B>),
    )
    // Files
    .route(
      storypoint_files,
      get(files::list::<S, B>)
        .post(files::upload::<S, B>)
        .layer(DefaultBodyLimit::max(upload_limit)),
    )
    .route(&format!("{storypoint_files}/archive"), get(files::archive::<S, B>))
    .route(
      &format!("{storypoint_files}/{{file_id}}"),
      get(files::download::<S, B>).delete(files::delete::<S, B>),
    )
    .route(&format!("{storypoint_files}/{{file_id}}/thumbnail"), get(files::thumbnail::<S, B>))
    .route(&format!("{storypoint_files}/{{file_id}}/rename"), put(files::rename::<S, B>))
    .with_state(state)
}

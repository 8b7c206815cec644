//! Runtime configuration, deserialised from `config.toml` and `GEOBASE__*`
//! environment variables.

use std::path::PathBuf;

use geobase_core::{geo::NearbyOptions, search::SearchOptions};
use serde::Deserialize;

/// The signing secret shipped in the defaults. Startup warns when it is
/// still in use.
pub const DEFAULT_JWT_SECRET: &str = "mysecret";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  pub blob_dir:       PathBuf,
  /// Scratch space for archives being assembled.
  pub temp_dir:       PathBuf,
  pub jwt_secret:     String,
  /// Token lifetime. `None` issues tokens without an `exp` claim, which then
  /// only die by revocation.
  pub token_ttl_secs: Option<u64>,
  pub enable_cors:    bool,
  pub validation:     ValidationConfig,
  pub search:         SearchOptions,
  pub nearby:         NearbyOptions,
  pub files:          FilesConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:           "127.0.0.1".to_string(),
      port:           3000,
      store_path:     PathBuf::from("geobase.db"),
      blob_dir:       PathBuf::from("uploads"),
      temp_dir:       PathBuf::from("tmp"),
      jwt_secret:     DEFAULT_JWT_SECRET.to_string(),
      token_ttl_secs: Some(7 * 24 * 60 * 60),
      enable_cors:    false,
      validation:     ValidationConfig::default(),
      search:         SearchOptions::default(),
      nearby:         NearbyOptions::default(),
      files:          FilesConfig::default(),
    }
  }
}

/// Switches for the input validators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
  pub email:    bool,
  pub password: bool,
  pub filename: bool,
}

impl Default for ValidationConfig {
  fn default() -> Self { Self { email: true, password: true, filename: true } }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
  pub max_upload_bytes:          u64,
  /// Suffixes eligible for thumbnails, compared case-insensitively.
  pub image_file_endings:        Vec<String>,
  pub thumbnail_width:           u32,
  pub thumbnail_height:          u32,
  /// Deflate level for archives; `None` uses the zip default.
  pub archive_compression_level: Option<i64>,
}

impl Default for FilesConfig {
  fn default() -> Self {
    Self {
      max_upload_bytes:          50 * 1024 * 1024,
      image_file_endings:        [".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp"]
        .into_iter()
        .map(String::from)
        .collect(),
      thumbnail_width:           200,
      thumbnail_height:          200,
      archive_compression_level: Some(9),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 8080\n[files]\nthumbnail_width = 64\n",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.files.thumbnail_width, 64);
    assert_eq!(cfg.files.thumbnail_height, 200);
    assert_eq!(cfg.nearby.limit, 10);
    assert!(cfg.validation.email);
    assert_eq!(cfg.jwt_secret, DEFAULT_JWT_SECRET);
  }
}

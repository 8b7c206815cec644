//! Error types for `geobase-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("coordinates out of range: ({lat}, {lon})")]
  InvalidCoordinates { lat: f64, lon: f64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

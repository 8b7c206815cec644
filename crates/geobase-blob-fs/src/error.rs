use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error on {path}: {source}")]
  Io {
    path:   String,
    #[source]
    source: std::io::Error,
  },
}

impl Error {
  pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
    Self::Io { path: path.display().to_string(), source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

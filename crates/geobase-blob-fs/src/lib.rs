//! Local-filesystem [`BlobStore`](geobase_core::blob::BlobStore) for
//! attachment bytes.

mod error;
mod file;

pub use error::{Error, Result};
pub use file::FileStore;

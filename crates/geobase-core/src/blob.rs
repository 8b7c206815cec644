//! The `BlobStore` trait: storage for attachment bytes.
//!
//! Blobs are addressed by attachment id. Content goes in and comes out as
//! async byte streams so large files are never held in memory.

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Metadata for a stored blob.
#[derive(Debug, Clone)]
pub struct BlobMeta {
  pub id:         Uuid,
  pub size:       u64,
  pub created_at: Option<DateTime<Utc>>,
}

pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Reader: AsyncRead + Send + Unpin + 'static;

  /// Copy `reader` into the blob `id` and return the number of bytes
  /// written. The blob only becomes visible once the copy has completed.
  fn write<'a, R>(
    &'a self,
    id: Uuid,
    reader: R,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a
  where
    R: AsyncRead + Send + Unpin + 'a;

  /// Open a blob for reading. Returns `None` if it does not exist.
  fn open(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Self::Reader>, Self::Error>> + Send + '_;

  /// Delete a blob. No-op if it does not exist.
  fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Enumerate every stored blob.
  fn list(&self) -> impl Future<Output = Result<Vec<BlobMeta>, Self::Error>> + Send + '_;
}

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use geobase_core::blob::{BlobMeta, BlobStore};
use tokio::io::{AsyncRead, AsyncWriteExt as _};
use uuid::Uuid;

use crate::{Error, Result};

/// A [`BlobStore`] backed by one flat directory.
///
/// Blob `id` lives at `{base_dir}/{id}`. Writes land in a `.part` sibling
/// first and are renamed into place once complete, so a reader never sees a
/// half-written blob.
#[derive(Debug, Clone)]
pub struct FileStore {
  base_dir: PathBuf,
}

impl FileStore {
  /// Open a store rooted at `base_dir`, creating the directory if needed.
  pub async fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
    let base_dir = base_dir.as_ref().to_path_buf();
    tokio::fs::create_dir_all(&base_dir)
      .await
      .map_err(|e| Error::io(&base_dir, e))?;
    Ok(Self { base_dir })
  }

  pub fn base_dir(&self) -> &Path { &self.base_dir }

  fn path_of(&self, id: Uuid) -> PathBuf { self.base_dir.join(id.hyphenated().to_string()) }

  fn part_path_of(&self, id: Uuid) -> PathBuf {
    self.base_dir.join(format!("{}.part", id.hyphenated()))
  }

  async fn copy_into<R>(&self, part: &Path, mut reader: R) -> Result<u64>
  where
    R: AsyncRead + Send + Unpin,
  {
    let mut file = tokio::fs::File::create(part)
      .await
      .map_err(|e| Error::io(part, e))?;
    let written = tokio::io::copy(&mut reader, &mut file)
      .await
      .map_err(|e| Error::io(part, e))?;
    file.flush().await.map_err(|e| Error::io(part, e))?;
    Ok(written)
  }
}

impl BlobStore for FileStore {
  type Error = Error;
  type Reader = tokio::fs::File;

  async fn write<'a, R>(&'a self, id: Uuid, reader: R) -> Result<u64>
  where
    R: AsyncRead + Send + Unpin + 'a,
  {
    let part = self.part_path_of(id);
    let written = match self.copy_into(&part, reader).await {
      Ok(n) => n,
      Err(e) => {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e);
      }
    };

    let path = self.path_of(id);
    if let Err(e) = tokio::fs::rename(&part, &path).await {
      let _ = tokio::fs::remove_file(&part).await;
      return Err(Error::io(&path, e));
    }
    tracing::debug!(%id, bytes = written, "blob written");
    Ok(written)
  }

  async fn open(&self, id: Uuid) -> Result<Option<tokio::fs::File>> {
    let path = self.path_of(id);
    match tokio::fs::File::open(&path).await {
      Ok(file) => Ok(Some(file)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(Error::io(&path, e)),
    }
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let path = self.path_of(id);
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(Error::io(&path, e)),
    }
  }

  async fn list(&self) -> Result<Vec<BlobMeta>> {
    let mut entries = tokio::fs::read_dir(&self.base_dir)
      .await
      .map_err(|e| Error::io(&self.base_dir, e))?;

    let mut results = Vec::new();
    while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|e| Error::io(&self.base_dir, e))?
    {
      // Skips `.part` leftovers and anything else not named by a uuid.
      let Some(id) = entry
        .file_name()
        .to_str()
        .and_then(|name| Uuid::parse_str(name).ok())
      else {
        continue;
      };
      let meta = entry.metadata().await.map_err(|e| Error::io(&entry.path(), e))?;
      if !meta.is_file() {
        continue;
      }
      results.push(BlobMeta {
        id,
        size: meta.len(),
        created_at: meta.modified().ok().map(DateTime::<Utc>::from),
      });
    }

    results.sort_by_key(|m| m.id);
    Ok(results)
  }
}

#[cfg(test)]
mod tests {
  use tokio::io::AsyncReadExt as _;

  use super::*;

  async fn store() -> (tempfile::TempDir, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("blobs")).await.unwrap();
    (dir, store)
  }

  #[tokio::test]
  async fn write_then_open_round_trips() {
    let (_dir, s) = store().await;
    let id = Uuid::new_v4();

    let n = s.write(id, &b"hello blob"[..]).await.unwrap();
    assert_eq!(n, 10);

    let mut buf = String::new();
    s.open(id).await.unwrap().unwrap().read_to_string(&mut buf).await.unwrap();
    assert_eq!(buf, "hello blob");
    assert!(!s.part_path_of(id).exists());
  }

  #[tokio::test]
  async fn open_missing_returns_none() {
    let (_dir, s) = store().await;
    assert!(s.open(Uuid::new_v4()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn delete_is_idempotent() {
    let (_dir, s) = store().await;
    let id = Uuid::new_v4();
    s.write(id, &b"x"[..]).await.unwrap();

    s.delete(id).await.unwrap();
    s.delete(id).await.unwrap();
    assert!(s.open(id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn list_ignores_foreign_files() {
    let (_dir, s) = store().await;
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    s.write(a, &b"aaa"[..]).await.unwrap();
    s.write(b, &b"bbbbb"[..]).await.unwrap();
    std::fs::write(s.base_dir().join("notes.txt"), b"ignore me").unwrap();
    std::fs::write(s.base_dir().join(format!("{a}.part")), b"stale").unwrap();

    let listed = s.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    let size_of = |id| listed.iter().find(|m| m.id == id).map(|m| m.size);
    assert_eq!(size_of(a), Some(3));
    assert_eq!(size_of(b), Some(5));
  }
}

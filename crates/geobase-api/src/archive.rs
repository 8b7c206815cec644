//! Zip packaging of a storypoint's attachments.
//!
//! The archive is written to an anonymous temp file on a blocking thread and
//! handed back as an async file positioned at the start, ready to be
//! streamed. The temp file has no name on disk, so it disappears once the
//! response body is dropped.

use std::{
  io::{self, Seek as _, SeekFrom},
  path::Path,
};

use tokio::io::AsyncRead;
use tokio_util::io::SyncIoBridge;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Write every `(name, reader)` pair into a deflated zip inside `temp_dir`.
pub async fn build<R>(
  entries: Vec<(String, R)>,
  temp_dir: &Path,
  compression_level: Option<i64>,
) -> io::Result<tokio::fs::File>
where
  R: AsyncRead + Send + Unpin + 'static,
{
  // Bridges must be created on the runtime; they are driven from the
  // blocking thread below.
  let bridges: Vec<(String, SyncIoBridge<R>)> = entries
    .into_iter()
    .map(|(name, reader)| (name, SyncIoBridge::new(reader)))
    .collect();
  let temp_dir = temp_dir.to_path_buf();

  let file = tokio::task::spawn_blocking(move || -> io::Result<std::fs::File> {
    let mut zip = ZipWriter::new(tempfile::tempfile_in(&temp_dir)?);
    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated)
      .compression_level(compression_level);

    for (name, mut reader) in bridges {
      zip.start_file(name, options).map_err(io::Error::other)?;
      io::copy(&mut reader, &mut zip)?;
    }

    let mut file = zip.finish().map_err(io::Error::other)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
  })
  .await
  .map_err(io::Error::other)??;

  Ok(tokio::fs::File::from_std(file))
}

/// `<title>.zip`, with characters that would break a quoted header value
/// replaced.
pub fn archive_filename(title: &str) -> String {
  let stem: String = title
    .chars()
    .map(|c| if c == '"' || c == '\\' || c == '/' || c.is_control() { '_' } else { c })
    .collect();
  let stem = stem.trim();
  if stem.is_empty() { "archive.zip".to_string() } else { format!("{stem}.zip") }
}

#[cfg(test)]
mod tests {
  use std::io::Read as _;

  use super::*;

  #[tokio::test]
  async fn build_writes_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let entries: Vec<(String, &'static [u8])> = vec![
      ("notes.txt".into(), b"field notes"),
      ("empty.bin".into(), b""),
    ];

    let file = build(entries, dir.path(), Some(6)).await.unwrap();
    let mut zip = zip::ZipArchive::new(file.into_std().await).unwrap();
    assert_eq!(zip.len(), 2);

    let mut contents = String::new();
    zip.by_name("notes.txt").unwrap().read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "field notes");
    assert_eq!(zip.by_name("empty.bin").unwrap().size(), 0);

    // Nothing named is left behind in the temp dir.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn build_with_no_entries_is_a_valid_archive() {
    let dir = tempfile::tempdir().unwrap();
    let file = build(Vec::<(String, &'static [u8])>::new(), dir.path(), None).await.unwrap();
    let zip = zip::ZipArchive::new(file.into_std().await).unwrap();
    assert_eq!(zip.len(), 0);
  }

  #[test]
  fn archive_filename_is_header_safe() {
    assert_eq!(archive_filename("Harbour Wall"), "Harbour Wall.zip");
    assert_eq!(archive_filename("a\"b\\c/d"), "a_b_c_d.zip");
    assert_eq!(archive_filename("  "), "archive.zip");
  }
}

//! PNG thumbnails for image attachments.

use std::io::Cursor;

use image::{ImageFormat, imageops::FilterType};

use crate::error::ApiError;

/// Decode `bytes`, scale and crop to exactly `width`×`height` (cover fit),
/// and re-encode as PNG.
pub fn render(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, image::ImageError> {
  let img = image::load_from_memory(bytes)?;
  let thumb = img.resize_to_fill(width.max(1), height.max(1), FilterType::Triangle);
  let mut out = Cursor::new(Vec::new());
  thumb.write_to(&mut out, ImageFormat::Png)?;
  Ok(out.into_inner())
}

pub async fn render_blocking(bytes: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ApiError> {
  tokio::task::spawn_blocking(move || render(&bytes, width, height))
    .await
    .map_err(ApiError::internal)?
    .map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
  use image::{GenericImageView as _, Rgb, RgbImage};

  use super::*;

  fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
  }

  #[test]
  fn render_covers_requested_box() {
    let thumb = render(&png(80, 20), 16, 16).unwrap();
    let decoded = image::load_from_memory(&thumb).unwrap();
    assert_eq!(decoded.dimensions(), (16, 16));
    assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Png);
  }

  #[test]
  fn render_rejects_non_images() {
    assert!(render(b"definitely not an image", 16, 16).is_err());
  }
}

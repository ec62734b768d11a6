//! Cover image localization.
//!
//! Remote covers are downloaded once, downscaled and re-encoded as JPEG
//! under `images/`, named by the hash of their URL.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use recipefeed_shared::{ImagesConfig, RecipeFeedError, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::http::HttpSession;

/// Directory (relative to the data root) holding localized images.
pub const IMAGES_DIR: &str = "images";

/// Stores a cover image and returns the reference to put in records.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Localize `url`, returning a data-root-relative path such as
    /// `images/<hash>.jpg`.
    async fn store_cover(&self, url: &str) -> Result<String>;
}

/// Writes JPEG covers to `<data_dir>/images`.
pub struct LocalImageStore {
    session: HttpSession,
    images_dir: PathBuf,
    max_side: u32,
    quality: u8,
}

impl LocalImageStore {
    pub fn new(session: HttpSession, data_dir: &Path, config: &ImagesConfig) -> Self {
        Self {
            session,
            images_dir: data_dir.join(IMAGES_DIR),
            max_side: config.max_side.max(1),
            quality: config.quality.clamp(1, 100),
        }
    }
}

fn file_name_for(url: &str) -> String {
    format!("{:x}.jpg", Sha256::digest(url.as_bytes()))
}

/// Decode any supported format, fit inside `max_side` and encode as JPEG.
pub fn reencode_jpeg(data: &[u8], max_side: u32, quality: u8) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RecipeFeedError::parse(format!("failed to read image: {e}")))?
        .decode()
        .map_err(|e| RecipeFeedError::parse(format!("failed to decode image: {e}")))?;

    let img = if img.width() > max_side || img.height() > max_side {
        img.thumbnail(max_side, max_side)
    } else {
        img
    };
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| RecipeFeedError::parse(format!("failed to encode image: {e}")))?;
    Ok(buf.into_inner())
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store_cover(&self, url: &str) -> Result<String> {
        let name = file_name_for(url);
        let reference = format!("{IMAGES_DIR}/{name}");
        let target = self.images_dir.join(&name);

        if target.exists() {
            debug!(%url, path = %target.display(), "image already stored");
            return Ok(reference);
        }

        let bytes = self.session.get_bytes(url).await?;
        let jpeg = reencode_jpeg(&bytes, self.max_side, self.quality)?;

        std::fs::create_dir_all(&self.images_dir)
            .map_err(|e| RecipeFeedError::io(&self.images_dir, e))?;
        let temp = self.images_dir.join(format!(".{name}.tmp"));
        std::fs::write(&temp, &jpeg).map_err(|e| RecipeFeedError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| RecipeFeedError::io(&target, e))?;

        debug!(%url, bytes = jpeg.len(), "image stored");
        Ok(reference)
    }
}

//! Image decoding with format detection, dimension limits, and timeout support.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Original encoded size in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory image on the blocking pool, bounded by `decode_timeout_ms`.
    ///
    /// `path` is only used for format fallback and error context.
    pub async fn decode_from_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<DecodedImage, PipelineError> {
        let path_owned = path.to_path_buf();
        let timeout_ms = self.limits.decode_timeout_ms;

        let decoded = timeout(
            Duration::from_millis(timeout_ms),
            tokio::task::spawn_blocking(move || decode_bytes_sync(bytes, &path_owned)),
        )
        .await
        .map_err(|_| PipelineError::Timeout {
            path: path.to_path_buf(),
            stage: "decode".to_string(),
            timeout_ms,
        })?
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Task join error: {e}"),
        })??;

        self.check_dimensions(&decoded, path)?;
        Ok(decoded)
    }

    fn check_dimensions(&self, decoded: &DecodedImage, path: &Path) -> Result<(), PipelineError> {
        let max_dim = self.limits.max_image_dimension;
        if decoded.width > max_dim || decoded.height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width: decoded.width,
                height: decoded.height,
                max_dim,
            });
        }
        Ok(())
    }
}

/// Decode bytes synchronously, sniffing the format from content before the extension.
pub fn decode_bytes_sync(bytes: Vec<u8>, path: &Path) -> Result<DecodedImage, PipelineError> {
    let file_size = bytes.len() as u64;
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot detect image format: {e}"),
        })?;

    let format = match reader.format() {
        Some(f) => f,
        None => ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        })?,
    };

    let image = reader.decode().map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    Ok(DecodedImage {
        image,
        format,
        width,
        height,
        file_size,
    })
}

/// Lowercase format name ("jpeg", "png", "webp", ...).
pub fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_lowercase()
}

#[cfg(test)]
pub(crate) fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

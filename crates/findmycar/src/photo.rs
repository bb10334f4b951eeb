//! Photo downsizing and encoding.
//!
//! Photos are shrunk so neither side exceeds a maximum dimension, re-encoded
//! as JPEG, and kept as a self-contained `data:image/jpeg;base64,` URL inside
//! the parking record.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use thiserror::Error;
use tracing::debug;

/// Default longest side of a stored photo, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1280;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Errors from photo processing.
#[derive(Debug, Error)]
pub enum PhotoError {
    /// No bytes were supplied.
    #[error("photo is empty")]
    Empty,

    /// The input is not a decodable image.
    #[error("not a readable image: {0}")]
    Decode(#[source] image::ImageError),

    /// Re-encoding the downsized image failed.
    #[error("failed to encode photo: {0}")]
    Encode(#[source] image::ImageError),

    /// The background encoding task did not complete.
    #[error("photo processing was interrupted: {0}")]
    Interrupted(String),
}

/// Size and quality limits for stored photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoOptions {
    /// Longest allowed side in pixels.
    pub max_dimension: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// A downsized, JPEG-encoded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPhoto {
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
    /// Width after downsizing.
    pub width: u32,
    /// Height after downsizing.
    pub height: u32,
}

impl EncodedPhoto {
    /// Size of the JPEG payload in bytes (before base64).
    #[must_use]
    pub fn byte_len(&self) -> usize {
        let b64 = self.data_url.len() - DATA_URL_PREFIX.len();
        b64 / 4 * 3
    }
}

/// Target size for `width` x `height` so the longer side is at most
/// `max_dimension`, keeping the aspect ratio. Images already small enough are
/// left alone; the result is never smaller than 1x1.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension || longest == 0 {
        return (width, height);
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decode `raw`, downsize it and re-encode it as a JPEG data URL.
///
/// # Errors
///
/// Returns [`PhotoError::Empty`] or [`PhotoError::Decode`] for unusable
/// input, and [`PhotoError::Encode`] if JPEG encoding fails.
pub fn encode_photo(raw: &[u8], options: PhotoOptions) -> Result<EncodedPhoto, PhotoError> {
    if raw.is_empty() {
        return Err(PhotoError::Empty);
    }

    let img = image::load_from_memory(raw).map_err(PhotoError::Decode)?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = fit_within(width, height, options.max_dimension);

    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        debug!(width, height, target_w, target_h, "Downsizing photo");
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();

    let mut jpeg = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg, options.quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(PhotoError::Encode)?;
    let jpeg = jpeg.into_inner();

    debug!(bytes = jpeg.len(), "Photo encoded");
    Ok(EncodedPhoto {
        data_url: format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&jpeg)),
        width: target_w,
        height: target_h,
    })
}

/// [`encode_photo`] on the blocking thread pool.
///
/// # Errors
///
/// Same as [`encode_photo`], plus [`PhotoError::Interrupted`] if the task
/// panicked or was cancelled.
pub async fn encode_photo_async(
    raw: Vec<u8>,
    options: PhotoOptions,
) -> Result<EncodedPhoto, PhotoError> {
    tokio::task::spawn_blocking(move || encode_photo(&raw, options))
        .await
        .map_err(|e| PhotoError::Interrupted(e.to_string()))?
}

/// Decode the JPEG bytes behind a data URL produced by [`encode_photo`].
///
/// Returns `None` for anything that is not a base64 JPEG data URL.
#[must_use]
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let b64 = data_url.strip_prefix(DATA_URL_PREFIX)?;
    STANDARD.decode(b64).ok()
}

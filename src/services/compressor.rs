//! Client-side style image compression.
//!
//! Decodes an uploaded image, bounds its longest edge, re-encodes it in the
//! category's preferred format and then shrinks it further, best-effort,
//! toward the category's byte budget.

use crate::models::{
    media::{CompressedAsset, MediaAsset},
    resource::ResourceKind,
};
use bytes::Bytes;
use image::{
    DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageError, ImageFormat,
    codecs::{jpeg::JpegEncoder, png::PngEncoder, webp::WebPEncoder},
    imageops::FilterType,
};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const INITIAL_QUALITY: u8 = 85;
const MIN_QUALITY: u8 = 40;
const QUALITY_STEP: u8 = 10;
const DOWNSCALE_FACTOR: f64 = 0.8;
const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("invalid compression policy: {0}")]
    InvalidPolicy(String),
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("image codec unavailable: {0}")]
    Codec(String),
    #[error("compression worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jpeg,
    Png,
}

impl OutputFormat {
    fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Webp => ImageFormat::WebP,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

/// Size, geometry and format limits applied to one asset category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    pub max_size_mb: f64,
    pub max_dimension_px: u32,
    pub output_format: OutputFormat,
    /// Run the codec on the blocking pool instead of the calling task.
    pub use_background_worker: bool,
}

impl CompressionPolicy {
    pub const DEFAULT: CompressionPolicy = CompressionPolicy {
        max_size_mb: 1.0,
        max_dimension_px: 1920,
        output_format: OutputFormat::Webp,
        use_background_worker: true,
    };

    pub const PROJECT: CompressionPolicy = CompressionPolicy {
        max_size_mb: 0.5,
        max_dimension_px: 1280,
        output_format: OutputFormat::Webp,
        use_background_worker: true,
    };

    pub const CERTIFICATE: CompressionPolicy = CompressionPolicy {
        max_size_mb: 0.4,
        max_dimension_px: 1024,
        output_format: OutputFormat::Webp,
        use_background_worker: true,
    };

    pub const SKILL_ICON: CompressionPolicy = CompressionPolicy {
        max_size_mb: 0.1,
        max_dimension_px: 300,
        output_format: OutputFormat::Webp,
        use_background_worker: true,
    };

    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Project => Self::PROJECT,
            ResourceKind::Certificate => Self::CERTIFICATE,
            ResourceKind::Skill => Self::SKILL_ICON,
        }
    }

    pub fn max_size_bytes(&self) -> usize {
        (self.max_size_mb * BYTES_PER_MB) as usize
    }

    fn validate(&self) -> Result<(), CompressionError> {
        if !(self.max_size_mb.is_finite() && self.max_size_mb > 0.0) {
            return Err(CompressionError::InvalidPolicy(format!(
                "max_size_mb must be positive, got {}",
                self.max_size_mb
            )));
        }
        if self.max_dimension_px == 0 {
            return Err(CompressionError::InvalidPolicy(
                "max_dimension_px must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compress `asset` according to `policy`.
///
/// With `use_background_worker` the work runs on tokio's blocking pool; the
/// result is identical either way.
pub async fn compress(
    asset: &MediaAsset,
    policy: &CompressionPolicy,
) -> Result<CompressedAsset, CompressionError> {
    policy.validate()?;
    if policy.use_background_worker {
        let raw = asset.raw.clone();
        let policy = *policy;
        tokio::task::spawn_blocking(move || compress_blocking(&raw, &policy))
            .await
            .map_err(|err| CompressionError::Worker(err.to_string()))?
    } else {
        compress_blocking(&asset.raw, policy)
    }
}

/// Synchronous core of [`compress`].
pub fn compress_blocking(
    raw: &[u8],
    policy: &CompressionPolicy,
) -> Result<CompressedAsset, CompressionError> {
    policy.validate()?;

    let source_format =
        image::guess_format(raw).map_err(|err| CompressionError::Decode(err.to_string()))?;
    let decoded = image::load_from_memory_with_format(raw, source_format)
        .map_err(|err| CompressionError::Decode(err.to_string()))?;

    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = fit_within(width, height, policy.max_dimension_px);
    let mut current = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Triangle)
    };

    let mut quality = INITIAL_QUALITY;
    let mut format = policy.output_format.image_format();
    let first = match encode(&current, format, quality) {
        Ok(bytes) => bytes,
        Err(ImageError::Unsupported(err)) => {
            debug!(
                "output format {:?} unsupported ({}); keeping source format {:?}",
                format, err, source_format
            );
            format = source_format;
            encode(&current, format, quality).map_err(codec_error)?
        }
        Err(err) => return Err(codec_error(err)),
    };
    let mut best = (first, current.width(), current.height());

    let budget = policy.max_size_bytes();
    for _ in 0..MAX_ATTEMPTS {
        if best.0.len() <= budget {
            break;
        }
        if format == ImageFormat::Jpeg && quality > MIN_QUALITY {
            quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
        } else {
            let next_width = ((current.width() as f64) * DOWNSCALE_FACTOR).round() as u32;
            let next_height = ((current.height() as f64) * DOWNSCALE_FACTOR).round() as u32;
            if next_width == 0 || next_height == 0 {
                break;
            }
            current = current.resize_exact(next_width, next_height, FilterType::Triangle);
        }
        let candidate = encode(&current, format, quality).map_err(codec_error)?;
        if candidate.len() < best.0.len() {
            best = (candidate, current.width(), current.height());
        }
    }

    let (bytes, width, height) = best;
    debug!(
        "compressed {} bytes to {} bytes at {}x{} ({:?})",
        raw.len(),
        bytes.len(),
        width,
        height,
        format
    );

    Ok(CompressedAsset {
        bytes: Bytes::from(bytes),
        mime_type: format.to_mime_type().to_string(),
        width,
        height,
    })
}

fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::WebP => {
            let rgba = image.to_rgba8();
            WebPEncoder::new_lossless(&mut buf).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        ImageFormat::Png => {
            let rgba = image.to_rgba8();
            PngEncoder::new(&mut buf).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        other => image.write_to(&mut Cursor::new(&mut buf), other)?,
    }
    Ok(buf)
}

fn codec_error(err: ImageError) -> CompressionError {
    CompressionError::Codec(err.to_string())
}

/// Scale `(width, height)` so the longer edge is at most `max_edge`,
/// preserving aspect ratio. Images already within bounds are unchanged.
fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }

    if width >= height {
        let scaled_height = ((height as f64) * (max_edge as f64) / (width as f64)).round() as u32;
        (max_edge, scaled_height.max(1))
    } else {
        let scaled_width = ((width as f64) * (max_edge as f64) / (height as f64)).round() as u32;
        (scaled_width.max(1), max_edge)
    }
}

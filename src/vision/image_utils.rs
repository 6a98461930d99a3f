// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for uploads and server-side files

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Upload cap used when none is configured (10 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Formats the detector accepts
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image is {0} bytes, limit is {1} bytes")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Decode an uploaded image, rejecting anything over `max_bytes`
pub fn decode_image_bytes(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    decode(bytes)
}

/// Read and decode an image file from disk
///
/// Files already on the server are not subject to the upload limit.
pub fn load_image_file(path: &Path) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if !path.is_file() {
        return Err(ImageError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: image.width(),
        height: image.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((image, info))
}

/// Sniff the container format and check it is one the service reads
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    match image::guess_format(bytes) {
        Ok(format) if SUPPORTED_FORMATS.contains(&format) => Ok(format),
        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Whether a MIME type names an image (`image/*`)
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

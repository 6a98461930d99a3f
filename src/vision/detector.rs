// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detector abstraction
//!
//! The region pipeline only needs `detect(image) -> detections`; concrete
//! inference backends implement [`Detector`] so they can be swapped without
//! touching the filter or merge logic.

use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

use crate::regions::{BoxError, Detection};

/// Errors raised by a detector backend
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detection model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load detection model: {0}")]
    LoadFailed(String),

    #[error("Detection inference failed: {0}")]
    InferenceFailed(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("Detector produced an invalid box: {0}")]
    InvalidBox(#[from] BoxError),
}

/// Single-capability interface over an object-detection model
pub trait Detector: Send + Sync {
    /// Short model identifier used in logs and health output
    fn name(&self) -> &str;

    /// Run the model over `image` and return every detection above the
    /// backend's confidence threshold, in pixel coordinates of `image`.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectorError>;
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based object detection
//!
//! This module provides:
//! - The `Detector` trait and its YOLOv8 ONNX backend
//! - Image loading helpers
//! - Debug image rendering

pub mod detector;
pub mod image_utils;
pub mod model_manager;
pub mod render;
pub mod yolo;

pub use detector::{Detector, DetectorError};
pub use image_utils::{decode_image_bytes, detect_format, load_image_file, ImageError, ImageInfo};
pub use model_manager::{DetectorManager, DetectorModelInfo};
pub use render::render_debug_images;
pub use yolo::YoloDetector;

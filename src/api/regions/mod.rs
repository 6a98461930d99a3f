// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region detection API endpoints
//!
//! Provides:
//! - POST /detect_regions_from_uploaded_image/ (multipart upload)
//! - POST /detect_regions_from_image_link/ (server-side path)

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{image_link_handler, upload_handler};
pub use request::{ImageLinkRequest, UPLOAD_FIELD};
pub use response::{MergedCoordinate, RegionData, RegionResponse};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region detection request types

use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "image_file";

/// Query string for `POST /detect_regions_from_image_link/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageLinkRequest {
    /// Server-side path of the image to analyse
    #[serde(default)]
    pub doc_file_name: Option<String>,
}

impl ImageLinkRequest {
    /// Validate the request and return the trimmed file name
    pub fn validate(&self) -> Result<&str, String> {
        match self.doc_file_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err("doc_file_name is required".to_string()),
        }
    }
}

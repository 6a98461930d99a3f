// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Fabstir Region Node

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-region-merge-2025-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-16";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolov8-onnx",
    "label-filter",
    "legacy-merge",
    "rectangle-union-merge",
    "multipart-upload",
    "image-link",
    "debug-images",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Region Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

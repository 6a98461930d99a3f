// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod regions;
pub mod storage;
pub mod utils;
pub mod version;
pub mod vision;

// Re-export main types
pub use config::NodeConfig;
pub use pipeline::{ExtractionError, RegionExtraction, RegionExtractor};
pub use regions::{
    filter_by_labels, merge_boxes, merge_intersecting, BoundingBox, BoxError, Detection, LabelSet,
    MergeStrategy,
};
pub use vision::{Detector, DetectorError};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region model and pure post-processing of detector output
//!
//! Components:
//! - `bounding_box` - `BoundingBox` and `Detection` value types
//! - `label_filter` - allow-list filtering by class label
//! - `merger` - consolidation of overlapping boxes

pub mod bounding_box;
pub mod label_filter;
pub mod merger;

pub use bounding_box::{BoundingBox, BoxError, Detection};
pub use label_filter::{filter_by_labels, LabelSet};
pub use merger::{merge_boxes, merge_intersecting, MergeStrategy};

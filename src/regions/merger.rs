// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Consolidation of overlapping detection boxes into merged regions
//!
//! Two algorithms are provided:
//! - [`merge_boxes`]: the legacy rule, a single sweep over boxes sorted by
//!   `x_min` that merges when `current.x_min + current.x_max >= next.x_min`.
//!   The test sums two coordinates and ignores the Y axis, so vertically
//!   distant boxes in the same horizontal band are merged. It is kept exactly
//!   because existing clients depend on its output.
//! - [`merge_intersecting`]: geometric rectangle union. Boxes are merged only
//!   when they actually intersect or touch, transitively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::bounding_box::BoundingBox;

/// Which merge algorithm the pipeline runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Legacy 1-D sweep on the X extent
    #[default]
    Legacy,
    /// Transitive union of intersecting rectangles
    RectangleUnion,
}

impl MergeStrategy {
    pub fn merge(&self, boxes: &[BoundingBox]) -> Vec<BoundingBox> {
        match self {
            MergeStrategy::Legacy => merge_boxes(boxes),
            MergeStrategy::RectangleUnion => merge_intersecting(boxes),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Legacy => "legacy",
            MergeStrategy::RectangleUnion => "rectangle_union",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(MergeStrategy::Legacy),
            "rectangle_union" | "rectangle-union" | "union" => Ok(MergeStrategy::RectangleUnion),
            other => Err(format!(
                "unknown merge strategy '{}', expected 'legacy' or 'rectangle_union'",
                other
            )),
        }
    }
}

/// Legacy merge: sweep boxes in ascending `x_min` order.
///
/// The sort is stable, so boxes with equal `x_min` keep their input order.
/// The overlap sum is computed in 64 bits and cannot overflow.
pub fn merge_boxes(boxes: &[BoundingBox]) -> Vec<BoundingBox> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by_key(|b| b.x_min());

    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    for next in iter {
        let reach = i64::from(current.x_min()) + i64::from(current.x_max());
        if reach >= i64::from(next.x_min()) {
            current = current.union(&next);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);

    merged
}

/// Geometric merge: union every group of transitively intersecting boxes.
///
/// Touching edges count as intersecting. The output holds pairwise disjoint
/// boxes sorted by `(x_min, y_min)`.
pub fn merge_intersecting(boxes: &[BoundingBox]) -> Vec<BoundingBox> {
    let mut out: Vec<BoundingBox> = Vec::with_capacity(boxes.len());

    // Every box already in `out` is disjoint from every other one; a new box
    // absorbs whatever it touches and is rescanned after each growth.
    for b in boxes {
        let mut current = *b;
        let mut i = 0;
        while i < out.len() {
            if out[i].intersects(&current) {
                current = current.union(&out.swap_remove(i));
                i = 0;
            } else {
                i += 1;
            }
        }
        out.push(current);
    }

    out.sort_by_key(|b| (b.x_min(), b.y_min()));
    out
}

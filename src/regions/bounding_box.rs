// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounding box and detection types shared by the detector, filter and merger

use serde::Serialize;
use thiserror::Error;

/// Errors raised when a box would violate its corner ordering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoxError {
    #[error("x_min ({x_min}) is greater than x_max ({x_max})")]
    InvertedX { x_min: i32, x_max: i32 },

    #[error("y_min ({y_min}) is greater than y_max ({y_max})")]
    InvertedY { y_min: i32, y_max: i32 },

    #[error("non-finite box coordinate: [{0}, {1}, {2}, {3}]")]
    NonFinite(f32, f32, f32, f32),
}

/// Axis-aligned rectangle in image pixel space, origin at the top-left corner.
///
/// The corners are private so that `x_min <= x_max` and `y_min <= y_max`
/// hold for every value in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    #[serde(rename = "xmin")]
    x_min: i32,
    #[serde(rename = "ymin")]
    y_min: i32,
    #[serde(rename = "xmax")]
    x_max: i32,
    #[serde(rename = "ymax")]
    y_max: i32,
}

impl BoundingBox {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Result<Self, BoxError> {
        if x_min > x_max {
            return Err(BoxError::InvertedX { x_min, x_max });
        }
        if y_min > y_max {
            return Err(BoxError::InvertedY { y_min, y_max });
        }
        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Build a box from detector float corners, truncating toward zero.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, BoxError> {
        if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
            return Err(BoxError::NonFinite(x1, y1, x2, y2));
        }
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    pub fn x_min(&self) -> i32 {
        self.x_min
    }

    pub fn y_min(&self) -> i32 {
        self.y_min
    }

    pub fn x_max(&self) -> i32 {
        self.x_max
    }

    pub fn y_max(&self) -> i32 {
        self.y_max
    }

    pub fn width(&self) -> u32 {
        self.x_max.abs_diff(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.abs_diff(self.y_min)
    }

    /// Smallest box covering both `self` and `other`
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// True when the closed rectangles share at least one point
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x_min <= other.x_max
            && other.x_min <= self.x_max
            && self.y_min <= other.y_max
            && other.y_min <= self.y_max
    }

    /// True when `other` lies entirely inside `self`
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }
}

/// A single object found by the detector
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, class_name: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        }
    }
}

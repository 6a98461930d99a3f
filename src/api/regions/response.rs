// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region detection response types

use serde::{Deserialize, Serialize};

use crate::pipeline::RegionExtraction;
use crate::regions::{BoundingBox, Detection};

/// A labelled detection as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionData {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
    /// Rounded to two decimals
    pub confidence: f64,
    pub class_id: u32,
    pub class_name: String,
}

impl From<&Detection> for RegionData {
    fn from(d: &Detection) -> Self {
        Self {
            xmin: d.bbox.x_min(),
            ymin: d.bbox.y_min(),
            xmax: d.bbox.x_max(),
            ymax: d.bbox.y_max(),
            confidence: round2(d.confidence),
            class_id: d.class_id,
            class_name: d.class_name.clone(),
        }
    }
}

/// A merged region as returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedCoordinate {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl From<&BoundingBox> for MergedCoordinate {
    fn from(b: &BoundingBox) -> Self {
        Self {
            xmin: b.x_min(),
            ymin: b.y_min(),
            xmax: b.x_max(),
            ymax: b.y_max(),
        }
    }
}

/// Success envelope for both region endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionResponse {
    pub status: String,
    pub status_code: u16,
    pub region_data: Vec<RegionData>,
    pub merged_coordinates: Vec<MergedCoordinate>,
}

impl RegionResponse {
    pub fn success(extraction: &RegionExtraction) -> Self {
        Self {
            status: "success".to_string(),
            status_code: 200,
            region_data: extraction.detections.iter().map(RegionData::from).collect(),
            merged_coordinates: extraction.merged.iter().map(MergedCoordinate::from).collect(),
        }
    }
}

/// Round to two decimals, ties to even on the exact value
fn round2(value: f32) -> f64 {
    let value = f64::from(value);
    let scaled = value * 100.0;
    // rounding error of the multiplication, decides apparent ties
    let residual = value.mul_add(100.0, -scaled);

    let rounded = if scaled - scaled.floor() == 0.5 {
        match residual.partial_cmp(&0.0) {
            Some(std::cmp::Ordering::Greater) => scaled.ceil(),
            Some(std::cmp::Ordering::Less) => scaled.floor(),
            _ => scaled.round_ties_even(),
        }
    } else {
        scaled.round()
    };
    rounded / 100.0
}

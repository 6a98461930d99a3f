// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 output decoding and non-maximum suppression
//!
//! A YOLOv8 detection head emits `[1, 4 + num_classes, num_anchors]`, each
//! anchor carrying `cx, cy, w, h` followed by per-class scores. Some exports
//! transpose this to `[1, num_anchors, 4 + num_classes]`; both are accepted.

use std::collections::HashMap;

use ndarray::{ArrayViewD, Axis, Ix2};

use super::class_names::ClassNames;
use super::preprocessing::Letterbox;
use crate::regions::{BoundingBox, Detection};
use crate::vision::detector::DetectorError;

/// Candidate box in original-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Intersection over union of two candidates
pub fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = a.area() + b.area() - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Decode a raw YOLOv8 output tensor into thresholded candidates
///
/// Box coordinates are mapped back through `letterbox` into the original
/// image and clamped to its bounds.
pub fn decode_output(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    confidence_threshold: f32,
) -> Result<Vec<Candidate>, DetectorError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectorError::InvalidOutput(format!(
            "expected [1, C, N] tensor, got {:?}",
            shape
        )));
    }

    // Exported YOLOv8 heads put the attribute axis first; anchors are the
    // larger dimension in every practical model.
    let preds = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectorError::InvalidOutput(e.to_string()))?;
    let preds = if shape[1] <= shape[2] {
        preds
    } else {
        preds.reversed_axes()
    };

    let attrs = preds.shape()[0];
    if attrs < 5 {
        return Err(DetectorError::InvalidOutput(format!(
            "output has {} attributes per anchor, need at least 5",
            attrs
        )));
    }

    let mut candidates = Vec::new();

    for anchor in preds.axis_iter(Axis(1)) {
        let (class_id, score) = anchor
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, &s)| {
                if s > best.1 {
                    (i, s)
                } else {
                    best
                }
            });

        if !score.is_finite() || score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }

        let x1 = letterbox.unmap_x(cx - w / 2.0);
        let y1 = letterbox.unmap_y(cy - h / 2.0);
        let x2 = letterbox.unmap_x(cx + w / 2.0);
        let y2 = letterbox.unmap_y(cy + h / 2.0);

        candidates.push(Candidate {
            x1,
            y1,
            x2,
            y2,
            confidence: score,
            class_id: class_id as u32,
        });
    }

    Ok(candidates)
}

/// Class-aware non-maximum suppression
///
/// Candidates of different classes never suppress each other. The result is
/// ordered by descending confidence.
pub fn non_max_suppression(candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    let mut by_class: HashMap<u32, Vec<Candidate>> = HashMap::new();
    for c in candidates {
        by_class.entry(c.class_id).or_default().push(c);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_class {
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut class_kept: Vec<Candidate> = Vec::new();
        for candidate in group {
            if class_kept
                .iter()
                .all(|k| iou(k, &candidate) <= iou_threshold)
            {
                class_kept.push(candidate);
            }
        }
        kept.extend(class_kept);
    }

    kept.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.x1.total_cmp(&b.x1))
            .then(a.y1.total_cmp(&b.y1))
    });
    kept
}

/// Convert surviving candidates into labelled detections
pub fn to_detections(
    candidates: &[Candidate],
    class_names: &ClassNames,
) -> Result<Vec<Detection>, DetectorError> {
    candidates
        .iter()
        .map(|c| {
            let bbox = BoundingBox::from_corners(c.x1, c.y1, c.x2, c.y2)?;
            Ok(Detection::new(
                c.class_id,
                class_names.name(c.class_id),
                c.confidence,
                bbox,
            ))
        })
        .collect()
}

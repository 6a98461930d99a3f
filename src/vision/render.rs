// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Debug image rendering
//!
//! Writes three JPEGs per request so an operator can eyeball what the
//! detector and merger produced:
//! - `<id>_white_mask.jpg` - detections filled white on a black canvas
//! - `<id>_white_mask_original.jpg` - detections filled white over the input
//! - `<id>_merged_overlap.jpg` - merged regions filled white over the input
//!
//! Rendering is best effort: failures are logged and never returned.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::regions::BoundingBox;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

pub const WHITE_MASK: &str = "white_mask";
pub const WHITE_MASK_ORIGINAL: &str = "white_mask_original";
pub const MERGED_OVERLAP: &str = "merged_overlap";

/// Fill every box white, corners inclusive
pub fn fill_boxes(canvas: &mut RgbImage, boxes: &[BoundingBox]) {
    for b in boxes {
        let rect = Rect::at(b.x_min(), b.y_min())
            .of_size(b.width().saturating_add(1), b.height().saturating_add(1));
        draw_filled_rect_mut(canvas, rect, WHITE);
    }
}

/// Render and save the three debug images; returns the paths written
pub fn render_debug_images(
    image: &DynamicImage,
    detections: &[BoundingBox],
    merged: &[BoundingBox],
    output_dir: &Path,
    request_id: &str,
) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        warn!(
            "Cannot create debug image directory {}: {}",
            output_dir.display(),
            e
        );
        return Vec::new();
    }

    let original = image.to_rgb8();
    let mut written = Vec::with_capacity(3);

    let mut mask = RgbImage::new(original.width(), original.height());
    fill_boxes(&mut mask, detections);
    save(&mask, output_dir, request_id, WHITE_MASK, &mut written);

    let mut overlay = original.clone();
    fill_boxes(&mut overlay, detections);
    save(&overlay, output_dir, request_id, WHITE_MASK_ORIGINAL, &mut written);

    let mut merged_overlay = original;
    fill_boxes(&mut merged_overlay, merged);
    save(&merged_overlay, output_dir, request_id, MERGED_OVERLAP, &mut written);

    written
}

fn save(canvas: &RgbImage, dir: &Path, request_id: &str, name: &str, written: &mut Vec<PathBuf>) {
    let path = dir.join(format!("{}_{}.jpg", request_id, name));
    match canvas.save(&path) {
        Ok(()) => {
            debug!("Wrote debug image {}", path.display());
            written.push(path);
        }
        Err(e) => warn!("Failed to write debug image {}: {}", path.display(), e),
    }
}

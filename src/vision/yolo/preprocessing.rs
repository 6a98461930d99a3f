// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detection models

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for YOLOv8 exports
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Padding colour used by the Ultralytics letterbox
pub const LETTERBOX_FILL: u8 = 114;

/// Geometry needed to map model coordinates back to the original image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Factor applied to the original image
    pub scale: f32,
    /// Horizontal padding on the left, in model pixels
    pub pad_x: f32,
    /// Vertical padding on the top, in model pixels
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// Map a model-space x coordinate to the original image, clamped to its width
    pub fn unmap_x(&self, x: f32) -> f32 {
        ((x - self.pad_x) / self.scale).clamp(0.0, self.orig_width as f32)
    }

    /// Map a model-space y coordinate to the original image, clamped to its height
    pub fn unmap_y(&self, y: f32) -> f32 {
        ((y - self.pad_y) / self.scale).clamp(0.0, self.orig_height as f32)
    }
}

/// Preprocess an image for YOLO detection
///
/// Steps:
/// 1. Letterbox to `input_size` (aspect preserved, padded with 114 gray)
/// 2. Scale pixel values to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_yolo(image: &DynamicImage, input_size: u32) -> (Array4<f32>, Letterbox) {
    let (padded, letterbox) = letterbox(image, input_size);

    let size = input_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in padded.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}

/// Resize with aspect ratio preservation and centre padding
pub fn letterbox(image: &DynamicImage, target_size: u32) -> (RgbImage, Letterbox) {
    let (orig_w, orig_h) = image.dimensions();
    let fill = Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]);

    // Handle edge cases
    if orig_w == 0 || orig_h == 0 {
        return (
            RgbImage::from_pixel(target_size, target_size, fill),
            Letterbox {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                orig_width: orig_w,
                orig_height: orig_h,
            },
        );
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);

    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = image
        .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    let mut output = RgbImage::from_pixel(target_size, target_size, fill);
    image::imageops::replace(&mut output, &resized, offset_x as i64, offset_y as i64);

    (
        output,
        Letterbox {
            scale,
            pad_x: offset_x as f32,
            pad_y: offset_y as f32,
            orig_width: orig_w,
            orig_height: orig_h,
        },
    )
}

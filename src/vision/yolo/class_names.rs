// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class index to label table for YOLO models

use std::path::Path;

use anyhow::{Context, Result};

/// The 80 COCO labels used by the stock YOLOv8 checkpoints
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Ordered class names for a detection model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::coco()
    }
}

impl ClassNames {
    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load one class name per line; blank lines are skipped
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class names from {}", path.display()))?;

        let names: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            anyhow::bail!("Class names file {} is empty", path.display());
        }

        Ok(Self { names })
    }

    /// Label for `class_id`, or `class_<id>` when the table is too short
    pub fn name(&self, class_id: u32) -> String {
        self.names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

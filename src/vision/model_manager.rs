// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector model manager for loading the object-detection backend

use std::sync::Arc;

use serde::Serialize;

use crate::config::DetectorConfig;
use crate::vision::detector::Detector;
use crate::vision::yolo::{ClassNames, YoloDetector};

/// Information about the loaded detection model
#[derive(Debug, Clone, Serialize)]
pub struct DetectorModelInfo {
    /// Model name
    pub name: String,
    /// Model type
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Owns the detector used by the region pipeline
///
/// A missing or broken model is logged and leaves the node running in a
/// degraded state where region requests fail with a server error.
pub struct DetectorManager {
    detector: Option<Arc<dyn Detector>>,
    model_name: String,
}

impl DetectorManager {
    /// Load the detector described by `config`
    pub fn new(config: &DetectorConfig) -> Self {
        let model_name = config
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());

        let class_names = match &config.class_names_path {
            Some(path) => match ClassNames::from_file(path) {
                Ok(names) => names,
                Err(e) => {
                    tracing::warn!("⚠️ {}; falling back to COCO class names", e);
                    ClassNames::coco()
                }
            },
            None => ClassNames::coco(),
        };

        let detector = match YoloDetector::new(&config.model_path, class_names) {
            Ok(model) => {
                let model = model
                    .with_confidence_threshold(config.confidence)
                    .with_iou_threshold(config.iou_threshold)
                    .with_input_size(config.input_size);
                tracing::info!(
                    "✅ Detector loaded from {} (confidence {:.2})",
                    config.model_path.display(),
                    config.confidence
                );
                Some(Arc::new(model) as Arc<dyn Detector>)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Failed to load detector from {}: {:#}",
                    config.model_path.display(),
                    e
                );
                None
            }
        };

        Self {
            detector,
            model_name,
        }
    }

    /// Wrap an already constructed detector
    pub fn with_detector(detector: Arc<dyn Detector>) -> Self {
        let model_name = detector.name().to_string();
        Self {
            detector: Some(detector),
            model_name,
        }
    }

    /// Get the detector if available
    pub fn get_detector(&self) -> Option<Arc<dyn Detector>> {
        self.detector.clone()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn model_info(&self) -> DetectorModelInfo {
        DetectorModelInfo {
            name: self.model_name.clone(),
            model_type: "object-detection".to_string(),
            available: self.detector.is_some(),
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 ONNX object detector
//!
//! Loads an Ultralytics YOLOv8 export and runs it on CPU through ONNX Runtime.

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::class_names::ClassNames;
use super::postprocessing::{decode_output, non_max_suppression, to_detections};
use super::preprocessing::{preprocess_for_yolo, YOLO_INPUT_SIZE};
use crate::regions::Detection;
use crate::vision::detector::{Detector, DetectorError};

/// Default confidence threshold
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Default IoU threshold for non-maximum suppression
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// YOLOv8 detector backed by an ONNX Runtime session
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Model file stem, used as the detector name
    model_name: String,
    class_names: ClassNames,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("classes", &self.class_names.len())
            .field("input_size", &self.input_size)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load a YOLOv8 model from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file does not exist or ONNX Runtime rejects it.
    pub fn new<P: AsRef<Path>>(model_path: P, class_names: ClassNames) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!("Loading YOLO model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load YOLO model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("YOLO model input: {} {:?}", input_name, input.input_type);
        }

        let model_name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());

        info!(
            "✅ YOLO model '{}' loaded ({} classes, CPU-only)",
            model_name,
            class_names.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_name,
            class_names,
            input_size: YOLO_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Set the confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the IoU threshold used by non-maximum suppression
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the square model input size (must match the export)
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(32);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }
}

impl Detector for YoloDetector {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectorError> {
        let (input, letterbox) = preprocess_for_yolo(image, self.input_size);

        let input_value = Value::from_array(input)
            .map_err(|e| DetectorError::InferenceFailed(format!("input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::InferenceFailed("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| DetectorError::InferenceFailed(e.to_string()))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectorError::InvalidOutput(e.to_string()))?;

        debug!("YOLO output shape: {:?}", output_tensor.shape());

        let candidates = decode_output(output_tensor.view(), &letterbox, self.confidence_threshold)?;
        let kept = non_max_suppression(candidates, self.iou_threshold);

        debug!("YOLO kept {} detections after NMS", kept.len());

        to_detections(&kept, &self.class_names)
    }
}

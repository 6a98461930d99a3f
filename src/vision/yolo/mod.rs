// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection via ONNX Runtime
//!
//! Components:
//! - `preprocessing` - letterbox and NCHW tensor conversion
//! - `postprocessing` - output decoding and class-aware NMS
//! - `class_names` - class index to label table
//! - `model` - `YoloDetector`, the ONNX session wrapper

pub mod class_names;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;

pub use class_names::{ClassNames, COCO_CLASSES};
pub use model::{YoloDetector, DEFAULT_CONFIDENCE, DEFAULT_IOU_THRESHOLD};
pub use preprocessing::{letterbox, preprocess_for_yolo, Letterbox, YOLO_INPUT_SIZE};

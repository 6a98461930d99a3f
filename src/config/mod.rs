// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Loaded once at startup from a TOML file, then overridden from environment
//! variables, validated, and shared read-only with every component.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::regions::{LabelSet, MergeStrategy};
use crate::vision::image_utils::DEFAULT_MAX_IMAGE_BYTES;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Object detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the YOLOv8 ONNX export
    pub model_path: PathBuf,
    /// Minimum class score for a detection to be reported
    pub confidence: f32,
    /// IoU above which same-class boxes are suppressed
    pub iou_threshold: f32,
    /// Square model input size
    pub input_size: u32,
    /// Allow-list of class labels
    pub labels: Vec<String>,
    /// Optional class names file (one label per line); COCO-80 when unset
    pub class_names_path: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov8n.onnx"),
            confidence: 0.25,
            iou_threshold: 0.45,
            input_size: 640,
            labels: Vec::new(),
            class_names_path: None,
        }
    }
}

impl DetectorConfig {
    pub fn label_set(&self) -> LabelSet {
        LabelSet::new(self.labels.iter().cloned())
    }
}

/// Where uploads and debug images go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub images_path: PathBuf,
    pub save_images: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_path: PathBuf::from("data/images"),
            save_images: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// When set, `doc_file_name` must resolve inside this directory
    pub link_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_IMAGE_BYTES,
            link_root: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub strategy: MergeStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs (without colours) to this file
    pub file: Option<PathBuf>,
}

/// Complete node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub detector: DetectorConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
    pub merge: MergeConfig,
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if it exists (defaults otherwise), apply environment
    /// overrides and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env();
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load from environment variables on top of defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    /// Override fields from any key lookup; unparsable values are ignored
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MODEL_PATH") {
            self.detector.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CONFIDENCE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.detector.confidence = v;
        }
        if let Some(v) = lookup("ALLOWED_LABELS") {
            let labels = LabelSet::parse(&v);
            self.detector.labels = labels.sorted().into_iter().map(str::to_string).collect();
        }
        if let Some(v) = lookup("IMAGES_PATH") {
            self.output.images_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SAVE_IMAGES") {
            self.output.save_images = matches!(v.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = v;
        }
        if let Some(v) = lookup("MERGE_STRATEGY").and_then(|v| v.parse().ok()) {
            self.merge.strategy = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.detector.model_path.as_os_str().is_empty() {
            return Err("Detector model path must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(format!(
                "Detector confidence must be between 0 and 1, got {}",
                self.detector.confidence
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(format!(
                "IoU threshold must be between 0 and 1, got {}",
                self.detector.iou_threshold
            ));
        }
        if self.detector.input_size == 0 || self.detector.input_size % 32 != 0 {
            return Err(format!(
                "Detector input size must be a positive multiple of 32, got {}",
                self.detector.input_size
            ));
        }
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if self.server.max_upload_bytes == 0 {
            return Err("Upload limit must be greater than 0".to_string());
        }
        Ok(())
    }

    /// `host:port` listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

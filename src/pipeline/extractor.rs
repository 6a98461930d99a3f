// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region extraction: detect, filter by label, merge

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::NodeConfig;
use crate::regions::{filter_by_labels, BoundingBox, Detection, LabelSet, MergeStrategy};
use crate::vision::detector::{Detector, DetectorError};
use crate::vision::image_utils::{
    decode_image_bytes, load_image_file, ImageError, DEFAULT_MAX_IMAGE_BYTES,
};
use crate::vision::render::render_debug_images;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Output of one extraction run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionExtraction {
    /// Detections that passed the label filter, in detector order
    pub detections: Vec<Detection>,
    /// Consolidated regions
    pub merged: Vec<BoundingBox>,
}

impl RegionExtraction {
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Runs detector, label filter and merger over a single image
#[derive(Clone)]
pub struct RegionExtractor {
    detector: Arc<dyn Detector>,
    labels: LabelSet,
    strategy: MergeStrategy,
    /// Debug image directory; `None` disables rendering
    debug_dir: Option<PathBuf>,
    /// Upper bound for decoded uploads
    max_image_bytes: usize,
}

impl std::fmt::Debug for RegionExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionExtractor")
            .field("detector", &self.detector.name())
            .field("labels", &self.labels.sorted())
            .field("strategy", &self.strategy)
            .field("debug_dir", &self.debug_dir)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl RegionExtractor {
    pub fn new(detector: Arc<dyn Detector>, labels: LabelSet) -> Self {
        Self {
            detector,
            labels,
            strategy: MergeStrategy::default(),
            debug_dir: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Build an extractor from node configuration
    pub fn from_config(detector: Arc<dyn Detector>, config: &NodeConfig) -> Self {
        let debug_dir = config
            .output
            .save_images
            .then(|| config.output.images_path.clone());

        Self::new(detector, config.detector.label_set())
            .with_strategy(config.merge.strategy)
            .with_debug_dir(debug_dir)
            .with_max_image_bytes(config.server.max_upload_bytes)
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    pub fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.max_image_bytes = max_bytes;
        self
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Load `image_path` and extract regions from it
    ///
    /// Blocking: run inside `spawn_blocking` from async code.
    pub fn extract(
        &self,
        image_path: &Path,
        request_id: &str,
    ) -> Result<RegionExtraction, ExtractionError> {
        info!(
            "[{}] Region extraction started for {}",
            request_id,
            image_path.display()
        );

        let (image, image_info) = load_image_file(image_path)?;
        debug!(
            "[{}] Loaded {}x{} {:?} image",
            request_id, image_info.width, image_info.height, image_info.format
        );

        self.extract_image(&image, request_id)
    }

    /// Decode an uploaded image within the configured size limit
    ///
    /// Blocking: run inside `spawn_blocking` from async code.
    pub fn decode_bytes(
        &self,
        bytes: &[u8],
        request_id: &str,
    ) -> Result<DynamicImage, ExtractionError> {
        let (image, image_info) = decode_image_bytes(bytes, self.max_image_bytes)?;
        debug!(
            "[{}] Decoded {}x{} {:?} upload ({} bytes)",
            request_id, image_info.width, image_info.height, image_info.format, image_info.size_bytes
        );

        Ok(image)
    }

    /// Extract regions from an already decoded image
    pub fn extract_image(
        &self,
        image: &DynamicImage,
        request_id: &str,
    ) -> Result<RegionExtraction, ExtractionError> {
        let start = Instant::now();

        let raw = self.detector.detect(image)?;
        let detected = raw.len();
        let detect_ms = start.elapsed().as_millis();

        let detections = filter_by_labels(raw, &self.labels);
        let boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
        let merged = self.strategy.merge(&boxes);

        info!(
            "[{}] {} detections, {} after label filter, {} merged regions ({} merge) in {}ms (detector {}ms)",
            request_id,
            detected,
            detections.len(),
            merged.len(),
            self.strategy,
            start.elapsed().as_millis(),
            detect_ms
        );

        if let Some(dir) = &self.debug_dir {
            let written = render_debug_images(image, &boxes, &merged, dir, request_id);
            debug!("[{}] Wrote {} debug images", request_id, written.len());
        }

        Ok(RegionExtraction { detections, merged })
    }

    /// Legacy contract: any failure is logged and yields empty results
    pub fn extract_or_empty(&self, image_path: &Path, request_id: &str) -> RegionExtraction {
        match self.extract(image_path, request_id) {
            Ok(extraction) => extraction,
            Err(e) => {
                error!("[{}] Region extraction failed: {}", request_id, e);
                RegionExtraction::default()
            }
        }
    }
}

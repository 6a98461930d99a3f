// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::server::AppState;
use crate::vision::DetectorModelInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorStatus {
    pub name: String,
    pub model_type: String,
    pub available: bool,
}

impl From<DetectorModelInfo> for DetectorStatus {
    fn from(info: DetectorModelInfo) -> Self {
        Self {
            name: info.name,
            model_type: info.model_type,
            available: info.available,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" when a detector is loaded, "degraded" otherwise
    pub status: String,
    pub version: String,
    pub detector: DetectorStatus,
    pub labels: Vec<String>,
    pub merge_strategy: String,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let info = state.detector_info.clone();
    let status = if info.available { "healthy" } else { "degraded" };

    let mut labels = state.config.detector.labels.clone();
    labels.sort();

    Json(HealthResponse {
        status: status.to_string(),
        version: crate::version::VERSION.to_string(),
        detector: info.into(),
        labels,
        merge_strategy: state.config.merge.strategy.to_string(),
    })
}

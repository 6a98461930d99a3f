// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint and server lifecycle tests
//!
//! Verifies that:
//! - GET /health reports "healthy" with a loaded detector
//! - GET /health reports "degraded" when the model is missing
//! - The configured labels and merge strategy are exposed
//! - `ApiServer` binds, serves and shuts down cleanly

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use fabstir_region_node::{
    api::{create_router, ApiConfig, ApiServer, AppState, HealthResponse},
    config::NodeConfig,
    regions::{Detection, MergeStrategy},
    vision::{Detector, DetectorError, DetectorManager},
};
use image::DynamicImage;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::util::ServiceExt;

struct EmptyDetector;

impl Detector for EmptyDetector {
    fn name(&self) -> &str {
        "empty"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, DetectorError> {
        Ok(Vec::new())
    }
}

fn config(dir: &Path) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.detector.labels = vec!["truck".to_string(), "bus".to_string()];
    config.detector.model_path = dir.join("yolov8s.onnx");
    config.output.images_path = dir.join("uploads");
    config
}

fn router(state: AppState) -> Router {
    let limit = state.config.server.max_upload_bytes;
    create_router(state, limit)
}

async fn get_health(app: Router) -> (StatusCode, HealthResponse) {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[cfg(test)]
mod health_tests {
    use super::*;

    /// Test 1: Healthy with a detector
    #[test]
    fn test_health_with_detector() {
        let dir = TempDir::new().unwrap();
        let manager = DetectorManager::with_detector(Arc::new(EmptyDetector));
        let app = router(AppState::new(config(dir.path()), &manager));

        let (status, health) = tokio_test::block_on(get_health(app));

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "healthy");
        assert_eq!(health.detector.name, "empty");
        assert!(health.detector.available);
        assert_eq!(health.labels, vec!["bus", "truck"]);
        assert_eq!(health.merge_strategy, "legacy");
        assert_eq!(health.version, fabstir_region_node::version::VERSION);
    }

    /// Test 2: Degraded without a model
    #[test]
    fn test_health_without_detector() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.merge.strategy = MergeStrategy::RectangleUnion;
        let manager = DetectorManager::new(&config.detector);
        let app = router(AppState::new(config, &manager));

        let (status, health) = tokio_test::block_on(get_health(app));

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "degraded");
        assert_eq!(health.detector.name, "yolov8s");
        assert!(!health.detector.available);
        assert_eq!(health.merge_strategy, "rectangle_union");
    }
}

#[cfg(test)]
mod server_tests {
    use super::*;

    /// Test 1: Server binds an ephemeral port, serves /health and stops
    #[tokio::test]
    async fn test_server_lifecycle() {
        let dir = TempDir::new().unwrap();
        let node_config = config(dir.path());
        let manager = DetectorManager::with_detector(Arc::new(EmptyDetector));
        let state = AppState::new(node_config, &manager);

        let api_config = ApiConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            ..ApiConfig::default()
        };
        let server = tokio_test::assert_ok!(ApiServer::new(api_config, state).await);
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);

        // Upload directory is created on startup
        assert!(dir.path().join("uploads").is_dir());

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
        assert!(response.contains("\"status\":\"healthy\""));

        server.shutdown().await;
    }

    /// Test 2: Invalid listen address is an error
    #[tokio::test]
    async fn test_server_invalid_address() {
        let dir = TempDir::new().unwrap();
        let manager = DetectorManager::with_detector(Arc::new(EmptyDetector));
        let state = AppState::new(config(dir.path()), &manager);

        let api_config = ApiConfig {
            listen_addr: "not an address".to_string(),
            ..ApiConfig::default()
        };
        assert!(ApiServer::new(api_config, state).await.is_err());
    }
}

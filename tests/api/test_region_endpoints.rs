// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Region endpoint tests
//!
//! Exercises the router end to end (without a socket) for:
//! - POST /detect_regions_from_uploaded_image/
//! - POST /detect_regions_from_image_link/
//!
//! The detector is mocked so these tests run without an ONNX model.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use fabstir_region_node::{
    api::{create_router, AppState, ErrorResponse, RegionResponse},
    config::NodeConfig,
    regions::{BoundingBox, Detection},
    vision::{Detector, DetectorError, DetectorManager},
};
use image::{DynamicImage, ImageFormat};
use mockall::mock;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

mock! {
    pub Yolo {}

    impl Detector for Yolo {
        fn name(&self) -> &str;
        fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectorError>;
    }
}

const BOUNDARY: &str = "region-test-boundary";
const UPLOAD_URI: &str = "/detect_regions_from_uploaded_image/";
const LINK_URI: &str = "/detect_regions_from_image_link/";

fn det(class_id: u32, label: &str, confidence: f32, bbox: (i32, i32, i32, i32)) -> Detection {
    let (x_min, y_min, x_max, y_max) = bbox;
    Detection::new(
        class_id,
        label,
        confidence,
        BoundingBox::new(x_min, y_min, x_max, y_max).expect("valid box"),
    )
}

/// Detections the mock returns for every image
fn street_scene() -> Vec<Detection> {
    vec![
        det(0, "person", 0.9132, (10, 20, 50, 120)),
        det(2, "car", 0.874, (40, 60, 140, 110)),
        det(16, "dog", 0.66, (300, 300, 320, 330)),
        det(0, "person", 0.51, (400, 10, 430, 90)),
    ]
}

fn mock_detector(detections: Vec<Detection>) -> Arc<dyn Detector> {
    let mut mock = MockYolo::new();
    mock.expect_name().return_const("mock-yolo".to_string());
    mock.expect_detect()
        .returning(move |_| Ok(detections.clone()));
    Arc::new(mock)
}

fn test_config(dir: &Path) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.detector.labels = vec!["person".to_string(), "car".to_string()];
    config.output.images_path = dir.join("uploads");
    config.server.link_root = Some(dir.to_path_buf());
    config
}

/// Helper: router with a mocked detector
fn app_with_detector(dir: &Path, detector: Arc<dyn Detector>) -> Router {
    let config = test_config(dir);
    let limit = config.server.max_upload_bytes;
    let state = AppState::new(config, &DetectorManager::with_detector(detector));
    create_router(state, limit)
}

/// Helper: router whose detector failed to load
fn app_without_detector(dir: &Path) -> Router {
    let mut config = test_config(dir);
    config.detector.model_path = dir.join("missing.onnx");
    let manager = DetectorManager::new(&config.detector);
    let limit = config.server.max_upload_bytes;
    create_router(AppState::new(config, &manager), limit)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn link_request(query: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("{}{}", LINK_URI, query))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_error(app: Router, request: Request<Body>) -> (StatusCode, ErrorResponse) {
    let (status, body) = send(app, request).await;
    let error: ErrorResponse = serde_json::from_slice(&body).expect("error envelope");
    (status, error)
}

#[cfg(test)]
mod upload_tests {
    use super::*;

    /// Test 1: Upload returns filtered detections and merged regions
    #[tokio::test]
    async fn test_upload_success() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(street_scene()));

        let body = multipart_body("image_file", "street.png", "image/png", &png_bytes(64, 64));
        let (status, body) = send(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::OK);
        let response: RegionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.status, "success");
        assert_eq!(response.status_code, 200);

        // dog filtered out
        assert_eq!(response.region_data.len(), 3);
        assert_eq!(response.region_data[0].class_name, "person");
        assert_eq!(response.region_data[0].confidence, 0.91);
        assert_eq!(response.region_data[1].class_id, 2);
        assert_eq!(response.region_data[1].confidence, 0.87);

        // 10+50 >= 40 merges person and car; 10+140 < 400
        let merged: Vec<(i32, i32, i32, i32)> = response
            .merged_coordinates
            .iter()
            .map(|m| (m.xmin, m.ymin, m.xmax, m.ymax))
            .collect();
        assert_eq!(merged, vec![(10, 20, 140, 120), (400, 10, 430, 90)]);
    }

    /// Test 2: Wire field names match the published contract
    #[tokio::test]
    async fn test_upload_json_shape() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(
            dir.path(),
            mock_detector(vec![det(0, "person", 0.5, (1, 2, 3, 4))]),
        );

        let body = multipart_body("image_file", "a.png", "image/png", &png_bytes(8, 8));
        let (_, body) = send(app, upload_request(UPLOAD_URI, body)).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            json["region_data"][0],
            serde_json::json!({
                "xmin": 1, "ymin": 2, "xmax": 3, "ymax": 4,
                "confidence": 0.5, "class_id": 0, "class_name": "person"
            })
        );
        assert_eq!(
            json["merged_coordinates"][0],
            serde_json::json!({"xmin": 1, "ymin": 2, "xmax": 3, "ymax": 4})
        );
    }

    /// Test 3: Route without trailing slash is also served
    #[tokio::test]
    async fn test_upload_without_trailing_slash() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let body = multipart_body("image_file", "a.png", "image/png", &png_bytes(8, 8));
        let (status, body) = send(app, upload_request("/detect_regions_from_uploaded_image", body)).await;

        assert_eq!(status, StatusCode::OK);
        let response: RegionResponse = serde_json::from_slice(&body).unwrap();
        assert!(response.region_data.is_empty());
        assert!(response.merged_coordinates.is_empty());
    }

    /// Test 4: Non-image content type is rejected
    #[tokio::test]
    async fn test_upload_rejects_non_image() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let body = multipart_body("image_file", "notes.txt", "text/plain", b"hello");
        let (status, error) = send_error(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.status, "error");
        assert_eq!(error.status_code, 400);
        assert_eq!(error.message, "Only image files are allowed.");
    }

    /// Test 5: Missing `image_file` field is rejected
    #[tokio::test]
    async fn test_upload_missing_field() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let body = multipart_body("file", "a.png", "image/png", &png_bytes(8, 8));
        let (status, error) = send_error(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid image file.");
    }

    /// Test 6: Non-multipart body is rejected
    #[tokio::test]
    async fn test_upload_not_multipart() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let request = Request::builder()
            .method(Method::POST)
            .uri(UPLOAD_URI)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, error) = send_error(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid image file.");
    }

    /// Test 7: Image content type with undecodable bytes
    #[tokio::test]
    async fn test_upload_corrupt_image() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(street_scene()));

        let body = multipart_body("image_file", "broken.png", "image/png", b"\x89PNG garbage");
        let (status, error) = send_error(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid image file.");
    }

    /// Test 8: Detector failure is a 500 with the generic prefix
    #[tokio::test]
    async fn test_upload_detector_failure() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockYolo::new();
        mock.expect_name().return_const("mock-yolo".to_string());
        mock.expect_detect()
            .returning(|_| Err(DetectorError::InferenceFailed("out of memory".to_string())));
        let app = app_with_detector(dir.path(), Arc::new(mock));

        let body = multipart_body("image_file", "a.png", "image/png", &png_bytes(8, 8));
        let (status, error) = send_error(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.status_code, 500);
        assert!(error.message.starts_with("Internal server error: "));
    }

    /// Test 9: Missing detector is reported as unavailable
    #[tokio::test]
    async fn test_upload_without_detector() {
        let dir = TempDir::new().unwrap();
        let app = app_without_detector(dir.path());

        let body = multipart_body("image_file", "a.png", "image/png", &png_bytes(8, 8));
        let (status, error) = send_error(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.status_code, 503);
    }

    /// Test 10: Identical file names are stored side by side
    #[tokio::test]
    async fn test_uploads_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        for _ in 0..2 {
            let body = multipart_body("image_file", "same.png", "image/png", &png_bytes(8, 8));
            let (status, _) = send(app.clone(), upload_request(UPLOAD_URI, body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let stored = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(stored, 2);
    }

    /// Test 11: Bodies over the upload limit are refused
    #[tokio::test]
    async fn test_upload_too_large() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let state = AppState::new(config, &DetectorManager::with_detector(mock_detector(Vec::new())));
        let app = create_router(state, 1024);

        let body = multipart_body("image_file", "big.png", "image/png", &vec![0u8; 8 * 1024]);
        let (status, _) = send(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    /// Test 12: A raised upload limit also applies to image decoding
    #[tokio::test]
    async fn test_upload_over_default_limit_with_raised_config() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.server.max_upload_bytes = 64 * 1024 * 1024;
        let limit = config.server.max_upload_bytes;
        let state = AppState::new(
            config,
            &DetectorManager::with_detector(mock_detector(street_scene())),
        );
        let app = create_router(state, limit);

        // uncompressed 24-bit BMP, ~12 MB
        let mut image = Vec::new();
        DynamicImage::new_rgb8(2000, 2000)
            .write_to(&mut Cursor::new(&mut image), ImageFormat::Bmp)
            .expect("encode bmp");
        assert!(image.len() > 10 * 1024 * 1024);

        let body = multipart_body("image_file", "scan.bmp", "image/bmp", &image);
        let (status, body) = send(app, upload_request(UPLOAD_URI, body)).await;

        assert_eq!(status, StatusCode::OK);
        let response: RegionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.region_data.len(), 3);
    }

    /// Test 13: Undecodable uploads are not kept on disk
    #[tokio::test]
    async fn test_corrupt_upload_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(street_scene()));

        for data in [&b"\x89PNG garbage"[..], &b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR"[..]] {
            let body = multipart_body("image_file", "broken.png", "image/png", data);
            let (status, _) = send(app.clone(), upload_request(UPLOAD_URI, body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let uploads = dir.path().join("uploads");
        let stored = std::fs::read_dir(&uploads).map(|d| d.count()).unwrap_or(0);
        assert_eq!(stored, 0);
    }
}

#[cfg(test)]
mod image_link_tests {
    use super::*;

    /// Test 1: Relative name inside the link root is analysed
    #[tokio::test]
    async fn test_image_link_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("street.png"), png_bytes(32, 32)).unwrap();
        let app = app_with_detector(dir.path(), mock_detector(street_scene()));

        let (status, body) = send(app, link_request("?doc_file_name=street.png")).await;

        assert_eq!(status, StatusCode::OK);
        let response: RegionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.region_data.len(), 3);
        assert_eq!(response.merged_coordinates.len(), 2);
    }

    /// Test 2: Missing parameter
    #[tokio::test]
    async fn test_image_link_missing_parameter() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let (status, error) = send_error(app, link_request("")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid document file name.");
    }

    /// Test 3: Blank parameter
    #[tokio::test]
    async fn test_image_link_blank_parameter() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let (status, error) = send_error(app, link_request("?doc_file_name=%20%20")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid document file name.");
    }

    /// Test 4: Unknown file
    #[tokio::test]
    async fn test_image_link_not_found() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let (status, error) = send_error(app, link_request("?doc_file_name=nope.png")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains("nope.png"));
    }

    /// Test 5: Paths escaping the link root are refused
    #[tokio::test]
    async fn test_image_link_outside_root() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(outer.path().join("secret.png"), png_bytes(8, 8)).unwrap();

        let app = app_with_detector(&root, mock_detector(Vec::new()));
        let (status, error) = send_error(app, link_request("?doc_file_name=../secret.png")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.status_code, 400);
    }

    /// Test 6: Existing file that is not an image
    #[tokio::test]
    async fn test_image_link_not_an_image() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.7").unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let (status, error) = send_error(app, link_request("?doc_file_name=report.pdf")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid image file.");
    }

    /// Test 7: Route without trailing slash
    #[tokio::test]
    async fn test_image_link_without_trailing_slash() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), png_bytes(8, 8)).unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/detect_regions_from_image_link?doc_file_name=a.png")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
    }

    /// Test 8: GET is not routed
    #[tokio::test]
    async fn test_image_link_rejects_get() {
        let dir = TempDir::new().unwrap();
        let app = app_with_detector(dir.path(), mock_detector(Vec::new()));

        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("{}?doc_file_name=a.png", LINK_URI))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

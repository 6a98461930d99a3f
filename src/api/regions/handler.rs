// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region detection endpoint handlers

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::request::{ImageLinkRequest, UPLOAD_FIELD};
use super::response::RegionResponse;
use crate::api::errors::{ApiError, INVALID_DOC_FILE_NAME, INVALID_IMAGE_FILE, ONLY_IMAGES_ALLOWED};
use crate::api::server::AppState;
use crate::pipeline::ExtractionError;
use crate::vision::image_utils::is_image_content_type;

/// POST /detect_regions_from_uploaded_image/ - Detect regions in an uploaded image
///
/// # Request
/// `multipart/form-data` with the image in the `image_file` field.
///
/// # Response
/// - `region_data`: label-filtered detections
/// - `merged_coordinates`: consolidated regions
///
/// # Errors
/// - 400 Bad Request: missing field, non-image content type, undecodable image
/// - 413 Payload Too Large: body exceeds the upload limit
/// - 503 Service Unavailable: detector not loaded
/// - 500 Internal Server Error: storage or detector failure
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RegionResponse>, ApiError> {
    let request_id = new_request_id();
    debug!("[{}] Region upload request received", request_id);

    let mut multipart = multipart.map_err(|e| {
        warn!("[{}] Rejected upload: {}", request_id, e);
        ApiError::InvalidRequest(INVALID_IMAGE_FILE.to_string())
    })?;

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("[{}] Ignoring multipart field {:?}", request_id, field.name());
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_image_content_type(&content_type) {
            warn!(
                "[{}] Upload rejected, content type '{}'",
                request_id, content_type
            );
            return Err(ApiError::InvalidRequest(ONLY_IMAGES_ALLOWED.to_string()));
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::InvalidRequest(INVALID_IMAGE_FILE.to_string()));
    };
    if bytes.is_empty() {
        return Err(ApiError::InvalidRequest(INVALID_IMAGE_FILE.to_string()));
    }

    let extractor = state.extractor()?;

    // Only decodable images are kept on disk
    let (image, bytes) = {
        let extractor = extractor.clone();
        run_blocking(request_id.clone(), move |id| {
            extractor.decode_bytes(&bytes, id).map(|image| (image, bytes))
        })
        .await?
    };

    let path = state
        .store
        .save(file_name.as_deref(), &bytes)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    info!(
        "[{}] Stored upload {:?} ({} bytes) as {}",
        request_id,
        file_name,
        bytes.len(),
        path.display()
    );

    let extraction =
        run_blocking(request_id, move |id| extractor.extract_image(&image, id)).await?;
    Ok(Json(RegionResponse::success(&extraction)))
}

/// POST /detect_regions_from_image_link/?doc_file_name=... - Detect regions in a server-side image
///
/// # Errors
/// - 400 Bad Request: missing `doc_file_name`, unknown path, path outside the link root
/// - 503 Service Unavailable: detector not loaded
/// - 500 Internal Server Error: detector failure
pub async fn image_link_handler(
    State(state): State<AppState>,
    query: Result<Query<ImageLinkRequest>, QueryRejection>,
) -> Result<Json<RegionResponse>, ApiError> {
    let request_id = new_request_id();

    let Query(request) =
        query.map_err(|_| ApiError::InvalidRequest(INVALID_DOC_FILE_NAME.to_string()))?;

    let doc_file_name = request.validate().map_err(|e| {
        warn!("[{}] Image link validation failed: {}", request_id, e);
        ApiError::InvalidRequest(INVALID_DOC_FILE_NAME.to_string())
    })?;

    debug!("[{}] Image link request for {}", request_id, doc_file_name);

    let extractor = state.extractor()?;
    let path = state.store.resolve_link(doc_file_name).map_err(|e| {
        warn!("[{}] Cannot resolve {}: {}", request_id, doc_file_name, e);
        ApiError::from(e)
    })?;

    let extraction = run_blocking(request_id, move |id| extractor.extract(&path, id)).await?;
    Ok(Json(RegionResponse::success(&extraction)))
}

/// Run a blocking pipeline step off the async runtime
async fn run_blocking<T, F>(request_id: String, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&str) -> Result<T, ExtractionError> + Send + 'static,
{
    let task_id = request_id.clone();
    let result = tokio::task::spawn_blocking(move || job(&task_id))
        .await
        .map_err(|e| ApiError::InternalError(format!("extraction task failed: {}", e)))?;

    result.map_err(|e| {
        warn!("[{}] Region extraction failed: {}", request_id, e);
        ApiError::from(e)
    })
}

fn multipart_error(e: MultipartError) -> ApiError {
    warn!("Multipart read failed: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::InvalidRequest(INVALID_IMAGE_FILE.to_string())
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

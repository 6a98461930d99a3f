// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::ExtractionError;
use crate::storage::StorageError;
use crate::vision::ImageError;

/// Message for a missing or undecodable upload
pub const INVALID_IMAGE_FILE: &str = "Invalid image file.";
/// Message for an upload whose content type is not `image/*`
pub const ONLY_IMAGES_ALLOWED: &str = "Only image files are allowed.";
/// Message for a missing `doc_file_name`
pub const INVALID_DOC_FILE_NAME: &str = "Invalid document file name.";

/// JSON error envelope: `{status: "error", status_code, message}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub status: String,
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    PayloadTooLarge(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::PayloadTooLarge(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
            ApiError::InternalError(msg) => format!("Internal server error: {}", msg),
        };

        ErrorResponse {
            status: "error".to_string(),
            status_code: self.status_code(),
            message,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(_) => ApiError::InvalidRequest(INVALID_DOC_FILE_NAME.to_string()),
            StorageError::NotFound(_) | StorageError::OutsideRoot(_) => ApiError::ValidationError {
                field: "doc_file_name".to_string(),
                message: err.to_string(),
            },
            StorageError::Io(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Image(
                ImageError::DecodeFailed(_) | ImageError::UnsupportedFormat | ImageError::EmptyData,
            ) => ApiError::InvalidRequest(INVALID_IMAGE_FILE.to_string()),
            ExtractionError::Image(err @ ImageError::TooLarge(..)) => {
                ApiError::PayloadTooLarge(err.to_string())
            }
            ExtractionError::Image(ImageError::NotFound(path)) => ApiError::ValidationError {
                field: "doc_file_name".to_string(),
                message: format!("Image file not found: {}", path.display()),
            },
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

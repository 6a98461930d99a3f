// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod regions;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{DetectorStatus, HealthResponse};
pub use regions::{
    image_link_handler, upload_handler, ImageLinkRequest, MergedCoordinate, RegionData,
    RegionResponse,
};
pub use server::{create_router, ApiConfig, ApiServer, AppState};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::errors::ApiError;
use super::handlers::health_handler;
use super::regions::{image_link_handler, upload_handler};
use crate::config::NodeConfig;
use crate::pipeline::RegionExtractor;
use crate::storage::UploadStore;
use crate::vision::{DetectorManager, DetectorModelInfo};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl From<&NodeConfig> for ApiConfig {
    fn from(config: &NodeConfig) -> Self {
        Self {
            listen_addr: config.listen_addr(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<NodeConfig>,
    /// `None` when the detector failed to load
    pub extractor: Option<Arc<RegionExtractor>>,
    pub store: UploadStore,
    pub detector_info: DetectorModelInfo,
}

impl AppState {
    pub fn new(config: NodeConfig, manager: &DetectorManager) -> Self {
        let extractor = manager
            .get_detector()
            .map(|detector| Arc::new(RegionExtractor::from_config(detector, &config)));

        let store = UploadStore::new(config.output.images_path.clone())
            .with_link_root(config.server.link_root.clone());

        Self {
            config: Arc::new(config),
            extractor,
            store,
            detector_info: manager.model_info(),
        }
    }

    /// The extractor, or 503 when no detector is loaded
    pub fn extractor(&self) -> Result<Arc<RegionExtractor>, ApiError> {
        self.extractor.clone().ok_or_else(|| {
            warn!("Region request received but detector is not loaded");
            ApiError::ServiceUnavailable("Detection model not loaded".to_string())
        })
    }
}

pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/detect_regions_from_uploaded_image/", post(upload_handler))
        .route("/detect_regions_from_uploaded_image", post(upload_handler))
        .route("/detect_regions_from_image_link/", post(image_link_handler))
        .route("/detect_regions_from_image_link", post(image_link_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    /// Bind `config.listen_addr` and start serving in the background
    pub async fn new(config: ApiConfig, state: AppState) -> Result<Self> {
        info!("🚀 API SERVER VERSION: {}", crate::version::VERSION);

        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let actual_addr = listener.local_addr()?;

        state
            .store
            .ensure_dir()
            .await
            .context("Failed to create upload directory")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = create_router(state, config.max_upload_bytes);

        let handle = tokio::spawn(async move {
            let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = serve_future.await {
                warn!("API server stopped with error: {}", e);
            }
        });

        info!("API server listening on {}", actual_addr);

        Ok(Self {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

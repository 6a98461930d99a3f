// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiConfig, ApiServer, AppState, RegionResponse};
use crate::config::{NodeConfig, DEFAULT_CONFIG_PATH};
use crate::pipeline::RegionExtractor;
use crate::vision::DetectorManager;

/// Fabstir Region Node
#[derive(Parser, Debug)]
#[command(name = "fabstir-region-node")]
#[command(version)]
#[command(about = "Object region detection and merging service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override the listen host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the detector model path
    #[arg(long)]
    pub model: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Run region extraction once on a local image and print the JSON result
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Image to analyse
    pub image: PathBuf,

    /// Write debug images to the configured output directory
    #[arg(long)]
    pub save_images: bool,
}

impl Cli {
    /// Load the config file, apply environment then command-line overrides
    pub fn load_config(&self) -> Result<NodeConfig> {
        let mut config = NodeConfig::load(&self.config)
            .with_context(|| format!("Failed to load configuration from {}", self.config.display()))?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(model) = &self.model {
            config.detector.model_path = model.clone();
        }
        if let Some(Commands::Detect(args)) = &self.command {
            config.output.save_images |= args.save_images;
        }

        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli, config: NodeConfig) -> Result<()> {
    if cli.config.exists() {
        info!("Configuration loaded from {}", cli.config.display());
    } else {
        warn!(
            "Config file {} not found, using defaults and environment",
            cli.config.display()
        );
    }

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Detect(args)) => detect_once(config, args.image).await,
    }
}

async fn serve(config: NodeConfig) -> Result<()> {
    let labels = config.detector.label_set();
    if labels.is_empty() {
        warn!("⚠️ No labels configured; every detection will be filtered out");
    } else {
        info!("Allowed labels: {:?}", labels.sorted());
    }

    let detector_config = config.detector.clone();
    let manager = tokio::task::spawn_blocking(move || DetectorManager::new(&detector_config))
        .await
        .context("Detector loading task failed")?;

    if !manager.has_detector() {
        warn!("⚠️ Region endpoints will return 503 until a model is available");
    }

    let api_config = ApiConfig::from(&config);
    let state = AppState::new(config, &manager);
    let server = ApiServer::new(api_config, state).await?;

    info!("✅ Region node ready on {}", server.local_addr());

    signal::ctrl_c().await?;
    info!("⏹️ Shutting down...");
    server.shutdown().await;
    info!("👋 Goodbye!");

    Ok(())
}

async fn detect_once(config: NodeConfig, image: PathBuf) -> Result<()> {
    let extraction = tokio::task::spawn_blocking(move || {
        let manager = DetectorManager::new(&config.detector);
        let detector = manager
            .get_detector()
            .ok_or_else(|| anyhow!("Detector could not be loaded from {}", config.detector.model_path.display()))?;

        let extractor = Arc::new(RegionExtractor::from_config(detector, &config));
        let request_id = Uuid::new_v4().simple().to_string();
        extractor
            .extract(&image, &request_id)
            .with_context(|| format!("Region extraction failed for {}", image.display()))
    })
    .await
    .context("Extraction task failed")??;

    let response = RegionResponse::success(&extraction);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

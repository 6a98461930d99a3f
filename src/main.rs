// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_region_node::{
    cli::{execute, Cli},
    utils::init_logging,
    version,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    init_logging(config.logging.file.as_deref())?;

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);
    info!("Features: {}", version::FEATURES.join(", "));

    execute(cli, config).await
}

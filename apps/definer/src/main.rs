mod config;
mod dataset;
mod definitions;
mod errors;
mod llm_client;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::config::{Cli, Config};
use crate::definitions::runner;
use crate::llm_client::LlmClient;
use crate::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on a missing ANTHROPIC_API_KEY)
    let config = Config::from_env(cli)?;

    // Initialize logging: stdout plus one file per run
    let logging = LoggingConfig::for_run(&config.rust_log, &config.log_dir, chrono::Local::now());
    let _log_guard = init_logging(&logging)?;

    info!("Starting definer v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.anthropic_api_key.clone(), &config.anthropic_base_url)
        .context("Failed to build HTTP client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let summary = runner::run(&config, &llm).await?;

    info!(
        "Processed {}/{} groups: {} succeeded, {} failed",
        summary.processed, summary.total_groups, summary.succeeded, summary.failed
    );
    info!(
        "Output: {} ({} checkpoint files written)",
        summary.output_path.display(),
        summary.checkpoints.len()
    );
    info!("Log file: {}", logging.log_path().display());

    Ok(())
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::dataset::grouping::GroupOrder;
use crate::definitions::runner::RunSettings;
use crate::errors::AppError;

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Command-line flags. Defaults reproduce the file layout the job has always used.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "definer",
    version,
    about = "Generate definitions for legislation terms from statutory text and case law"
)]
pub struct Cli {
    /// Input CSV with one row per (term, legislation, case-law paragraph).
    #[arg(long, default_value = "final_dataser_of_key_phrases.csv")]
    pub input: PathBuf,

    /// Prompt template with {legislation_term}, {legislation_id}, {section_text},
    /// {case_law_paragraphs} and {case_terms} placeholders.
    #[arg(long, default_value = "prompt.txt")]
    pub template: PathBuf,

    /// Final output CSV.
    #[arg(long, default_value = "legislation_term_definitions.csv")]
    pub output: PathBuf,

    /// Directory for definitions_intermediate_<n>.csv checkpoint files.
    #[arg(long, default_value = ".")]
    pub checkpoint_dir: PathBuf,

    /// Write a checkpoint after every N processed groups.
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: usize,

    /// Pause between consecutive API calls, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,

    /// Process only the first K groups (e.g. `--max-groups 1` for a smoke run).
    /// Omit to process every group.
    #[arg(long)]
    pub max_groups: Option<usize>,

    /// Order groups by (term, identifier) instead of first appearance in the input.
    #[arg(long)]
    pub sort_groups: bool,

    /// Directory for the per-run llm_responses_<timestamp>.log file.
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,
}

/// Application configuration, built once at startup from the environment
/// (plus `.env` if present) and the command line.
#[derive(Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub rust_log: String,
    pub input_path: PathBuf,
    pub template_path: PathBuf,
    pub log_dir: PathBuf,
    pub group_order: GroupOrder,
    pub run: RunSettings,
}

impl Config {
    pub fn from_env(cli: Cli) -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let api_key = require_env("ANTHROPIC_API_KEY")?;
        let base_url = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string());
        let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self::build(cli, api_key, base_url, rust_log)?)
    }

    fn build(
        cli: Cli,
        api_key: String,
        base_url: String,
        rust_log: String,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(invalid("ANTHROPIC_API_KEY is set but empty"));
        }
        if cli.checkpoint_every == 0 {
            return Err(invalid("--checkpoint-every must be at least 1"));
        }
        if cli.max_groups == Some(0) {
            return Err(invalid(
                "--max-groups must be at least 1 (omit it to process every group)",
            ));
        }

        let group_order = if cli.sort_groups {
            GroupOrder::Sorted
        } else {
            GroupOrder::FirstSeen
        };

        Ok(Config {
            anthropic_api_key: api_key.trim().to_string(),
            anthropic_base_url: base_url.trim_end_matches('/').to_string(),
            rust_log,
            input_path: cli.input,
            template_path: cli.template,
            log_dir: cli.log_dir,
            group_order,
            run: RunSettings {
                output_path: cli.output,
                checkpoint_dir: cli.checkpoint_dir,
                checkpoint_every: cli.checkpoint_every,
                delay: Duration::from_millis(cli.delay_ms),
                max_groups: cli.max_groups,
            },
        })
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(message.to_string())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where and how verbosely a run logs. Every run gets its own file so the
/// full prompt/response audit trail of one batch stays together.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub file_name: String,
}

impl LoggingConfig {
    /// Names the log file after the run's start time, e.g. `llm_responses_20250114_093000.log`.
    pub fn for_run(level: impl Into<String>, log_dir: impl Into<PathBuf>, started: DateTime<Local>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            file_name: run_log_file_name(started),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }
}

pub fn run_log_file_name(started: DateTime<Local>) -> String {
    format!("llm_responses_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Installs the global subscriber: one layer to stdout, one to the run's log file.
///
/// The returned guard flushes the file writer on drop and must be held until
/// the run ends.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    ensure_dir(&config.log_dir)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    let file_appender = tracing_appender::rolling::never(&config.log_dir, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name_encodes_start_time() {
        let started = Local.with_ymd_and_hms(2025, 1, 14, 9, 30, 5).unwrap();
        assert_eq!(run_log_file_name(started), "llm_responses_20250114_093005.log");
    }

    #[test]
    fn test_log_path_joins_directory() {
        let started = Local.with_ymd_and_hms(2025, 1, 14, 9, 30, 5).unwrap();
        let config = LoggingConfig::for_run("info", "logs", started);
        assert_eq!(
            config.log_path(),
            PathBuf::from("logs").join("llm_responses_20250114_093005.log")
        );
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Installs the global `tracing` subscriber: a console layer filtered by the debug flags, and
//! with the `file-logging` feature a rotating JSON file under a timestamped run directory.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Console output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format '{other}' (expected text or json)"),
        }
    }
}

/// `EnvFilter` with `base_level` for every target plus `debug` for the crates in `debug_flags`
pub fn env_filter(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string_with_base(base_level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter directives: {directives}"))
}

fn console_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
    }
}

/// Install console logging at `info` plus the crates enabled in `debug_flags`
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, format: LogFormat) -> Result<()> {
    init_logging_with_level(debug_flags, "info", format)
}

/// Install console logging with `base_level` for crates without a debug flag
pub fn init_logging_with_level(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    format: LogFormat,
) -> Result<()> {
    let filter = env_filter(debug_flags, base_level)?;
    Registry::default()
        .with(console_layer(format).with_filter(filter))
        .try_init()
        .context("Global tracing subscriber already installed")
}

#[cfg(feature = "file-logging")]
pub use file::{init_file_logging, LoggingGuard};

#[cfg(feature = "file-logging")]
mod file {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use chrono::Utc;
    use tracing_appender::rolling;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{Layer, Registry};

    use super::{console_layer, env_filter, LogFormat};
    use crate::cli::CrateDebugFlags;

    /// Name of the log file inside a run directory
    pub const LOG_FILE_NAME: &str = "feagi-vision.log";

    /// Keeps the background file writer alive; logs are flushed when it drops
    pub struct LoggingGuard {
        _file_guard: tracing_appender::non_blocking::WorkerGuard,
        log_dir: PathBuf,
    }

    impl LoggingGuard {
        /// The run directory holding this session's log files
        pub fn log_dir(&self) -> &Path {
            &self.log_dir
        }
    }

    /// Install console logging plus a JSON log file rotated daily.
    ///
    /// Files go to `<log_dir>/run_<YYYYmmdd_HHMMSS>/feagi-vision.log`.
    pub fn init_file_logging(
        debug_flags: &CrateDebugFlags,
        format: LogFormat,
        log_dir: &Path,
    ) -> Result<LoggingGuard> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let run_folder = log_dir.join(format!("run_{timestamp}"));
        std::fs::create_dir_all(&run_folder).with_context(|| {
            format!("Failed to create log directory: {}", run_folder.display())
        })?;

        let file_appender = rolling::daily(&run_folder, LOG_FILE_NAME);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(env_filter(debug_flags, "info")?);

        Registry::default()
            .with(console_layer(format).with_filter(env_filter(debug_flags, "info")?))
            .with(file_layer)
            .try_init()
            .context("Global tracing subscriber already installed")?;

        Ok(LoggingGuard {
            _file_guard: file_guard,
            log_dir: run_folder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_bad_base_level_is_rejected() {
        let flags = CrateDebugFlags::default();
        assert!(env_filter(&flags, "info").is_ok());
        assert!(env_filter(&flags, "very=loud").is_err());
    }

    #[test]
    fn test_second_init_fails() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-feagi-vision".to_string()]);
        init_logging(&flags, LogFormat::Text).unwrap();
        tracing::debug!(target: "feagi_vision", "subscriber installed");
        assert!(init_logging(&flags, LogFormat::Json).is_err());
    }
}

//! Logging Module
//!
//! tracing-based logging shared by the command line tools:
//! - a daily-rolling log file (system temp dir by default)
//! - an optional stderr layer for verbose runs
//! - pruning of old log files
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{LogConfig, init_logging};
//! use tracing::info;
//!
//! init_logging("archivevideo", LogConfig::default()).expect("Failed to initialize logging");
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for log files (system temp dir by default)
    pub log_dir: PathBuf,
    /// Log files kept after pruning, default 5
    pub max_files: usize,
    /// Level used when `RUST_LOG` is not set, default Info
    pub level: Level,
    /// Also write log records to stderr
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir(),
            max_files: 5,
            level: Level::INFO,
            stderr: false,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }

    /// Configuration for a command line run: verbose runs log at DEBUG and
    /// mirror the log to stderr.
    pub fn for_cli(verbose: bool) -> Self {
        let config = Self::default().with_stderr(verbose);
        if verbose {
            config.with_level(Level::DEBUG)
        } else {
            config
        }
    }
}

/// Crate targets use underscores even when the program name has dashes.
fn filter_target(program_name: &str) -> String {
    program_name.replace('-', "_")
}

/// 初始化日志系统
///
/// Installs the global subscriber: `{program_name}.log` in `config.log_dir`
/// (rotated daily), plus stderr when `config.stderr` is set. `RUST_LOG`
/// overrides the default filter. Can only be called once per process.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let log_file_name = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &log_file_name);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "archive_video={level},shared_utils={level},{}={level}",
            filter_target(program_name),
            level = config.level
        ))
    });

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        program = program_name,
        log_dir = ?config.log_dir,
        log_file = log_file_name,
        max_files = config.max_files,
        level = ?config.level,
        "Logging system initialized"
    );

    cleanup_old_logs(&config.log_dir, program_name, config.max_files)?;

    Ok(())
}

/// Keep the `max_files` most recently modified logs of `program_name`.
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    let mut logs: Vec<(std::time::SystemTime, PathBuf)> = std::fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_log_of(&entry.file_name().to_string_lossy(), program_name))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file()
                .then(|| meta.modified().ok())
                .flatten()
                .map(|modified| (modified, entry.path()))
        })
        .collect();

    if logs.len() <= max_files {
        return Ok(());
    }

    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in logs.into_iter().skip(max_files) {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = ?path, "Removed old log file"),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove old log file"),
        }
    }
    Ok(())
}

/// `archivevideo.log` and its dated rotations `archivevideo.log.2026-01-31`.
fn is_log_of(file_name: &str, program_name: &str) -> bool {
    file_name
        .strip_prefix(program_name)
        .is_some_and(|rest| rest.starts_with(".log"))
}

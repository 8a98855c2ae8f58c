//! Logging configuration
//!
//! Persisted settings for the tracing subscriber the application installs.
//! The subscriber itself lives in the binary; this module only describes
//! what it should do and manages the log directory.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Timestamp shared by every log path computed in this process.
static SESSION_STAMP: Lazy<String> =
    Lazy::new(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());

const LOG_FILE_PREFIX: &str = "deckflow_";
const LOG_FILE_EXTENSION: &str = "log";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a file in `log_directory`
    pub file_output: bool,
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Number of log files kept; older ones are removed at startup
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_log_files: 10,
        }
    }
}

impl LogConfig {
    /// Parses `level`, falling back to INFO.
    pub fn parse_level(&self) -> tracing::Level {
        self.level
            .trim()
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }

    /// Creates the log directory when file output is enabled.
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of the log file for this process.
    pub fn current_log_path(&self) -> PathBuf {
        self.log_directory.join(format!(
            "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXTENSION}",
            *SESSION_STAMP
        ))
    }

    /// Removes the oldest log files so that at most `max_log_files - 1`
    /// remain, leaving room for the file about to be created.
    pub fn cleanup_old_logs(&self) -> io::Result<()> {
        if !self.log_directory.is_dir() {
            return Ok(());
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_log_file(path))
            .collect();

        let keep = self.max_log_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort chronologically.
        logs.sort();
        let excess = logs.len() - keep;
        for path in logs.into_iter().take(excess) {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn is_log_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == LOG_FILE_EXTENSION);
    name_matches && ext_matches
}

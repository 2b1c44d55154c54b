//! Logging configuration
//!
//! Only the settings live here; subscriber setup belongs to the application.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Log file name prefix
const LOG_FILE_PREFIX: &str = "facecast";

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a file in `log_directory`
    pub file_output: bool,
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Number of log files kept after cleanup
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
    /// Parsed level, `INFO` when unrecognised
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    /// Create the log directory if file output is on
    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        if self.file_output {
            std::fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Log file for this process
    pub fn current_log_path(&self) -> PathBuf {
        self.log_directory
            .join(format!("{}-{}.log", LOG_FILE_PREFIX, std::process::id()))
    }

    /// Delete the oldest log files beyond `max_log_files`.
    ///
    /// Returns how many files were removed.
    pub fn cleanup_old_logs(&self) -> std::io::Result<usize> {
        if !self.log_directory.is_dir() {
            return Ok(0);
        }

        let mut logs = Vec::new();
        for entry in std::fs::read_dir(&self.log_directory)? {
            let entry = entry?;
            let path = entry.path();
            let is_ours = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
                .unwrap_or(false);
            if is_ours {
                let modified = entry.metadata()?.modified()?;
                logs.push((modified, path));
            }
        }

        if logs.len() <= self.max_log_files {
            return Ok(0);
        }

        // Oldest first
        logs.sort_by(|a, b| a.0.cmp(&b.0));
        let excess = logs.len() - self.max_log_files;
        for (_, path) in logs.iter().take(excess) {
            std::fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

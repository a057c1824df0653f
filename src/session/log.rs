// ABOUTME: JSONL session logger — appends timestamped turn records to a log file.
// ABOUTME: The TUI owns the terminal, so diagnostics go to files under ~/.sage/logs/.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// A single JSONL log entry: when, who, and what.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub role: String,
    pub content: String,
}

/// Appends session events as JSONL lines to a per-run log file.
pub struct SessionLogger {
    writer: BufWriter<File>,
}

impl SessionLogger {
    /// Create a session logger under `~/.sage/logs/`, opening a new JSONL
    /// file named with the current timestamp.
    pub fn new() -> anyhow::Result<Self> {
        Self::new_in_dir(&Config::logs_dir())
    }

    /// Create a session logger that writes to a specific directory (for testing).
    pub fn new_in_dir(logs_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(logs_dir)?;
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let log_path = logs_dir.join(format!("{}.jsonl", timestamp));
        let file = File::create(&log_path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one turn record, flushed immediately so crashes lose nothing.
    pub fn log_turn(&mut self, role: &str, content: &str) -> anyhow::Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            role: role.to_string(),
            content: content.to_string(),
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

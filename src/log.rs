//! Simple file-based logging for deskremote
//!
//! Logs to <base>/.tmp/logs/deskremote.log in JSONL format:
//! ISO 8601 timestamps, level, subsystem, event, and a free-form message.
//! Connection handlers must never write to stdout/stderr, so everything
//! goes through this file.

use chrono::Utc;
use serde::Serialize;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;

/// Log entry structure for safe JSON serialization
#[derive(Serialize)]
struct LogEntry<'a> {
    ts: String,
    level: String,
    subsystem: &'a str,
    event: &'a str,
    msg: &'a str,
}

/// Log a message to the deskremote log file
pub fn log(level: &str, subsystem: &str, event: &str, message: &str) {
    let path = crate::paths::log_path();

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        let _ = create_dir_all(parent);
    }

    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let entry = LogEntry {
        ts: timestamp,
        level: level.to_uppercase(),
        subsystem,
        event,
        msg: message,
    };

    // Serialize with serde_json for proper escaping
    let log_line = match serde_json::to_string(&entry) {
        Ok(line) => line,
        Err(_) => return, // Silently fail on serialization error
    };

    // Append to file
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = writeln!(file, "{}", log_line);
    }
}

/// Log info message
pub fn log_info(subsystem: &str, event: &str, message: &str) {
    log("info", subsystem, event, message);
}

/// Log warning message
pub fn log_warn(subsystem: &str, event: &str, message: &str) {
    log("warn", subsystem, event, message);
}

/// Log error message
pub fn log_error(subsystem: &str, event: &str, message: &str) {
    log("error", subsystem, event, message);
}

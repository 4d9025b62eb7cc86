//! Centralized path resolution for deskremote
//!
//! Single source of truth for all deskremote directory and file paths.
//! Respects DESKREMOTE_DIR / DESKREMOTE_WEB_ROOT env vars, falls back
//! to ~/.deskremote.

use crate::config::Config;
use std::path::PathBuf;

/// Get the deskremote base directory.
///
/// Uses centralized Config (DESKREMOTE_DIR env var or ~/.deskremote fallback).
pub fn base_dir() -> PathBuf {
    Config::get().base_dir
}

/// Get the log file path (base_dir/.tmp/logs/deskremote.log)
pub fn log_path() -> PathBuf {
    base_dir().join(".tmp").join("logs").join("deskremote.log")
}

/// Get the web root holding the control-panel page and assets.
pub fn web_root() -> PathBuf {
    Config::get().web_root
}

/// Get the control-panel page path (web_root/index.html)
pub fn index_path() -> PathBuf {
    web_root().join("index.html")
}

/// Get the bundled assets directory (web_root/assets)
pub fn assets_dir() -> PathBuf {
    web_root().join("assets")
}

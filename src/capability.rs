//! Privileged OS automation behind one narrow interface.
//!
//! Everything platform-specific lives here: permission checks, synthetic
//! key events, process-table queries, and launch/terminate. The rest of
//! the crate depends only on the `Capability` trait, so tests run against
//! a mock and the host backend can change per target OS.

use std::process::Command;

use crate::config::Config;
use crate::keys::{Key, Modifier};
use crate::log::{log_error, log_warn};

/// Result of invoking the OS generic launcher.
#[derive(Debug, Clone)]
pub struct LaunchOutput {
    pub exit_code: i32,
    pub stderr: String,
}

/// Errors from the platform layer
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// OS refused to synthesize an input event
    #[error("event creation failed: {0}")]
    EventCreationFailed(String),

    /// The launcher binary itself could not be started
    #[error("launcher error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Narrow abstraction over privileged OS actions.
///
/// `bundle_id` is the OS-level identifier matched literally against
/// process-table entries to tie a running process to a registered app.
pub trait Capability: Send + Sync {
    /// True when the process holds the OS automation/input permission.
    fn check_permission(&self) -> bool;

    /// Ask the OS to surface its permission-grant UI. Fire and forget.
    fn request_permission(&self);

    /// Post a synthetic down+up pair for `key`.
    fn inject_key(&self, key: Key) -> Result<(), CapabilityError>;

    /// Live query against the OS process table. Never cached.
    fn is_process_running(&self, bundle_id: &str) -> bool;

    /// Invoke the OS generic launcher with an app path.
    fn launch_process(&self, path: &str) -> Result<LaunchOutput, CapabilityError>;

    /// Request graceful termination of matching processes.
    /// Returns false when no matching process was found.
    fn terminate_process(&self, bundle_id: &str) -> bool;

    /// Forcibly kill matching processes.
    fn force_terminate_process(&self, bundle_id: &str) -> bool;

    /// Identity of the current foreground process, if it can be determined.
    fn foreground_process_id(&self) -> Option<String>;
}

/// Host backend: shells out to the OS for automation.
///
/// Key injection and foreground queries go through `osascript`; process
/// matching parses `ps` output against the registry's identifier pattern;
/// launching uses the configured generic launcher (`/usr/bin/open` by
/// default).
pub struct HostCapability;

impl HostCapability {
    pub fn new() -> Self {
        HostCapability
    }

    /// Pids whose process-table entry contains `needle` as a literal
    /// substring, each verified alive with a kill(pid, 0) probe since
    /// `ps` output can be stale.
    fn matching_pids(&self, needle: &str) -> Vec<i32> {
        let output = match Command::new("ps").args(["axo", "pid=,command="]).output() {
            Ok(out) => out,
            Err(e) => {
                log_error("capability", "ps.spawn_failed", &e.to_string());
                return Vec::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        candidate_pids(needle, &stdout)
            .into_iter()
            .filter(|&pid| {
                // SAFETY: kill(pid, 0) checks process existence without
                // sending a signal. pid was parsed from ps output as a
                // valid i32.
                (unsafe { libc::kill(pid, 0) }) == 0
            })
            .collect()
    }

    fn osascript(&self, script: &str) -> Result<String, CapabilityError> {
        let output = Command::new("osascript").args(["-e", script]).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CapabilityError::EventCreationFailed(stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Parse `ps axo pid=,command=` output, keeping pids whose command line
/// contains `needle` literally. Dots in a bundle identifier must not act
/// as wildcards, so the identifier is regex-escaped before matching.
fn candidate_pids(needle: &str, ps_output: &str) -> Vec<i32> {
    let re = match regex::Regex::new(&regex::escape(needle)) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut pids = Vec::new();
    for line in ps_output.lines() {
        let trimmed = line.trim_start();
        let Some((pid_str, command)) = trimmed.split_once(' ') else {
            continue;
        };
        let Ok(pid) = pid_str.parse::<i32>() else {
            continue;
        };
        if re.is_match(command) {
            pids.push(pid);
        }
    }
    pids
}

impl Capability for HostCapability {
    fn check_permission(&self) -> bool {
        // Counting System Events processes only succeeds once the user has
        // granted the automation permission. Cheap, read-only probe.
        self.osascript("tell application \"System Events\" to count processes")
            .is_ok()
    }

    fn request_permission(&self) {
        // Surface the privacy pane; granting happens out-of-band.
        let result = Command::new("open")
            .arg("x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility")
            .status();
        if let Err(e) = result {
            log_warn("capability", "request_permission.failed", &e.to_string());
        }
    }

    fn inject_key(&self, key: Key) -> Result<(), CapabilityError> {
        let script = match key.modifiers() {
            [] => format!("tell application \"System Events\" to key code {}", key.code()),
            mods => {
                let held: Vec<&str> = mods
                    .iter()
                    .map(|m| match m {
                        Modifier::Control => "control down",
                        Modifier::Command => "command down",
                    })
                    .collect();
                format!(
                    "tell application \"System Events\" to key code {} using {{{}}}",
                    key.code(),
                    held.join(", ")
                )
            }
        };
        self.osascript(&script).map(|_| ())
    }

    fn is_process_running(&self, bundle_id: &str) -> bool {
        !self.matching_pids(bundle_id).is_empty()
    }

    fn launch_process(&self, path: &str) -> Result<LaunchOutput, CapabilityError> {
        let launcher = Config::get().launcher;
        let output = Command::new(&launcher).arg(path).output()?;
        Ok(LaunchOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn terminate_process(&self, bundle_id: &str) -> bool {
        let pids = self.matching_pids(bundle_id);
        if pids.is_empty() {
            return false;
        }
        for pid in &pids {
            // SAFETY: pid verified alive by matching_pids. SIGTERM requests
            // graceful shutdown; delivery failure is tolerated (process may
            // have exited between the probe and this call).
            unsafe {
                libc::kill(*pid, libc::SIGTERM);
            }
        }
        true
    }

    fn force_terminate_process(&self, bundle_id: &str) -> bool {
        let pids = self.matching_pids(bundle_id);
        if pids.is_empty() {
            return false;
        }
        for pid in &pids {
            // SAFETY: same as terminate_process; SIGKILL is the escalation
            // path after graceful termination ran out of attempts.
            unsafe {
                libc::kill(*pid, libc::SIGKILL);
            }
        }
        true
    }

    fn foreground_process_id(&self) -> Option<String> {
        self.osascript(
            "tell application \"System Events\" to get bundle identifier of first application process whose frontmost is true",
        )
        .ok()
        .filter(|s| !s.is_empty())
    }
}

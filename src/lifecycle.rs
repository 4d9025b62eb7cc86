//! App lifecycle controller: launch, terminate, toggle.
//!
//! All waits are fixed-interval polling with no backoff and no
//! cancellation; each poll blocks only the connection thread servicing
//! the request. The launch path deliberately reports success when the
//! launcher exited 0 but the process was never observed - the launcher
//! is trusted over our own polling (slow-starting GUI apps routinely
//! outlast both checks).

use std::path::Path;
use std::time::Duration;

use crate::capability::Capability;
use crate::log::{log_info, log_warn};
use crate::registry::AppDescriptor;

/// Fixed-interval retry schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Graceful-termination polling: 0.5s x 10 = 5s before escalation.
    pub fn terminate_default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 10,
        }
    }
}

/// Post-launch confirmation timing.
///
/// One coarse wait tuned for slow-starting GUI apps, then a single
/// shorter re-check (`coarse_wait - recheck_interval`).
#[derive(Debug, Clone, Copy)]
pub struct LaunchTiming {
    pub coarse_wait: Duration,
    pub recheck_interval: Duration,
}

impl LaunchTiming {
    pub fn default_timing() -> Self {
        Self {
            coarse_wait: Duration::from_secs(5),
            recheck_interval: Duration::from_millis(500),
        }
    }
}

/// Lifecycle failures surfaced to the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Unregistered app name, or a registered app whose launch path is gone
    #[error("app not found: {0}")]
    AppNotFound(String),

    #[error("launch failed for {name}: {detail}")]
    LaunchFailed { name: String, detail: String },

    #[error("terminate failed for {0}")]
    TerminateFailed(String),
}

/// Launch/terminate state machine over the capability interface.
pub struct LifecycleController {
    pub launch_timing: LaunchTiming,
    pub terminate_policy: RetryPolicy,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self {
            launch_timing: LaunchTiming::default_timing(),
            terminate_policy: RetryPolicy::terminate_default(),
        }
    }
}

impl LifecycleController {
    /// Launch an app and wait for it to come up.
    ///
    /// Fails fast when the launch path is missing on disk or the launcher
    /// exits non-zero. After a zero exit, the process is polled twice; an
    /// unconfirmed process is still reported as success (the launcher
    /// already said yes).
    pub fn launch(&self, cap: &dyn Capability, app: &AppDescriptor) -> Result<(), LifecycleError> {
        if !Path::new(&app.launch_path).exists() {
            log_warn("lifecycle", "launch.path_missing", &app.launch_path);
            return Err(LifecycleError::AppNotFound(app.name.clone()));
        }

        let output = cap
            .launch_process(&app.launch_path)
            .map_err(|e| LifecycleError::LaunchFailed {
                name: app.name.clone(),
                detail: e.to_string(),
            })?;

        if output.exit_code != 0 {
            log_warn(
                "lifecycle",
                "launch.launcher_failed",
                &format!("app={} exit={} stderr={}", app.name, output.exit_code, output.stderr),
            );
            return Err(LifecycleError::LaunchFailed {
                name: app.name.clone(),
                detail: format!("launcher exited {}: {}", output.exit_code, output.stderr),
            });
        }

        std::thread::sleep(self.launch_timing.coarse_wait);
        if cap.is_process_running(&app.bundle_id) {
            log_info("lifecycle", "launch.confirmed", &app.name);
            return Ok(());
        }

        // Second chance for slow starters
        let recheck_wait = self
            .launch_timing
            .coarse_wait
            .saturating_sub(self.launch_timing.recheck_interval);
        std::thread::sleep(recheck_wait);
        if cap.is_process_running(&app.bundle_id) {
            log_info("lifecycle", "launch.confirmed_late", &app.name);
            return Ok(());
        }

        // Launcher exited 0 but the process never showed. Tolerated
        // ambiguity: report success anyway.
        log_warn("lifecycle", "launch.unconfirmed", &app.name);
        Ok(())
    }

    /// Gracefully terminate an app, escalating to a forced kill when the
    /// process outlives the retry schedule.
    pub fn terminate(&self, cap: &dyn Capability, app: &AppDescriptor) -> Result<(), LifecycleError> {
        if !cap.terminate_process(&app.bundle_id) {
            log_warn("lifecycle", "terminate.not_running", &app.name);
            return Err(LifecycleError::TerminateFailed(app.name.clone()));
        }

        if self.wait_for_exit(cap, &app.bundle_id) {
            log_info("lifecycle", "terminate.confirmed", &app.name);
            return Ok(());
        }

        log_warn("lifecycle", "terminate.escalate_force", &app.name);
        if !cap.force_terminate_process(&app.bundle_id) {
            // Nothing left to kill: it exited between polls
            return Ok(());
        }

        if self.wait_for_exit(cap, &app.bundle_id) {
            log_info("lifecycle", "terminate.force_confirmed", &app.name);
            return Ok(());
        }

        Err(LifecycleError::TerminateFailed(app.name.clone()))
    }

    /// Flip an app between running and not-running based on the state the
    /// caller sampled before invoking.
    pub fn toggle(
        &self,
        cap: &dyn Capability,
        app: &AppDescriptor,
        was_running: bool,
    ) -> Result<(), LifecycleError> {
        if was_running {
            self.terminate(cap, app)
        } else {
            self.launch(cap, app)
        }
    }

    fn wait_for_exit(&self, cap: &dyn Capability, bundle_id: &str) -> bool {
        for _ in 0..self.terminate_policy.max_attempts {
            std::thread::sleep(self.terminate_policy.interval);
            if !cap.is_process_running(bundle_id) {
                return true;
            }
        }
        false
    }
}

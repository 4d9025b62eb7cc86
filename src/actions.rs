//! Action vocabulary and dispatch for the /api/ routes.
//!
//! Action names are parsed into a closed enum so new actions are a
//! compile-time-checked addition, not a string case. Dispatch applies the
//! permission gate, invokes the capability/lifecycle layer, and folds
//! every outcome into one JSON envelope shape:
//! `{"status": ..}` or `{"status": .., "error": ..}`.

use std::sync::Arc;

use serde::Serialize;

use crate::capability::Capability;
use crate::keys::Key;
use crate::lifecycle::LifecycleController;
use crate::lock::is_screen_locked;
use crate::log::{log_info, log_warn};
use crate::registry::AppRegistry;

/// Error message returned when the permission gate rejects an action.
pub const PERMISSION_MESSAGE: &str = "accessibility permission not granted";

/// One invocable control operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Synthetic key press (media, navigation, space)
    Key(Key),
    /// Lock the session (refuses when already locked)
    Lock,
    /// Read-only lock-state query
    LockStatus,
    /// Flip a registered app between running and stopped
    Toggle(String),
    /// Read-only running-state query for one app
    Status(String),
    /// Diagnostic: running state of every registered app
    TestApps,
    /// Unrecognized action name, reported back to the caller
    Unknown(String),
}

impl Action {
    /// Parse the path tail after `/api/`.
    pub fn parse(name: &str) -> Self {
        match name {
            "playpause" => Action::Key(Key::PlayPause),
            "space" => Action::Key(Key::Space),
            "next" => Action::Key(Key::NextTrack),
            "prev" => Action::Key(Key::PrevTrack),
            "volumeup" => Action::Key(Key::VolumeUp),
            "volumedown" => Action::Key(Key::VolumeDown),
            "mute" => Action::Key(Key::Mute),
            "arrowup" => Action::Key(Key::ArrowUp),
            "arrowdown" => Action::Key(Key::ArrowDown),
            "lock" => Action::Lock,
            "lock_status" => Action::LockStatus,
            "test_apps" => Action::TestApps,
            _ => {
                if let Some(app) = name.strip_prefix("toggle_") {
                    Action::Toggle(app.to_string())
                } else if let Some(app) = name.strip_prefix("status_") {
                    Action::Status(app.to_string())
                } else {
                    Action::Unknown(name.to_string())
                }
            }
        }
    }

    /// Read-only queries and the unknown fallback skip the gate; every
    /// action that drives the OS requires the privileged capability.
    pub fn requires_permission(&self) -> bool {
        !matches!(
            self,
            Action::LockStatus | Action::Status(_) | Action::TestApps | Action::Unknown(_)
        )
    }
}

/// Fixed JSON envelope for every /api/ response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn failed(status: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: Some(error.into()),
        }
    }

    /// Serialize to the wire shape.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| "{\"status\":\"error\"}".to_string())
    }
}

/// Maps action names to capability/lifecycle calls behind the gate.
pub struct Dispatcher {
    cap: Arc<dyn Capability>,
    registry: Arc<AppRegistry>,
    lifecycle: LifecycleController,
}

impl Dispatcher {
    pub fn new(
        cap: Arc<dyn Capability>,
        registry: Arc<AppRegistry>,
        lifecycle: LifecycleController,
    ) -> Self {
        Self {
            cap,
            registry,
            lifecycle,
        }
    }

    /// Execute the named action and produce its envelope.
    pub fn dispatch(&self, name: &str) -> ApiResponse {
        let action = Action::parse(name);
        log_info("actions", "dispatch", name);

        if action.requires_permission() && !self.cap.check_permission() {
            log_warn("actions", "permission_denied", name);
            return ApiResponse::failed("failed", PERMISSION_MESSAGE);
        }

        match action {
            Action::Key(key) => match self.cap.inject_key(key) {
                Ok(()) => ApiResponse::ok("success"),
                Err(e) => {
                    log_warn("actions", "inject_failed", &format!("{key}: {e}"));
                    ApiResponse::failed("failed", e.to_string())
                }
            },
            Action::Lock => self.lock(),
            Action::LockStatus => {
                if is_screen_locked(self.cap.as_ref()) {
                    ApiResponse::ok("locked")
                } else {
                    ApiResponse::ok("unlocked")
                }
            }
            Action::Toggle(app_name) => self.toggle(&app_name),
            Action::Status(app_name) => match self.registry.get(&app_name) {
                Some(app) => {
                    if self.cap.is_process_running(&app.bundle_id) {
                        ApiResponse::ok("running")
                    } else {
                        ApiResponse::ok("stopped")
                    }
                }
                None => ApiResponse::failed("failed", format!("unknown app: {app_name}")),
            },
            Action::TestApps => {
                let states: Vec<String> = self
                    .registry
                    .all()
                    .map(|app| {
                        let state = if self.cap.is_process_running(&app.bundle_id) {
                            "running"
                        } else {
                            "stopped"
                        };
                        format!("{}:{}", app.name, state)
                    })
                    .collect();
                ApiResponse::ok(states.join(","))
            }
            Action::Unknown(name) => {
                log_warn("actions", "unknown_action", &name);
                ApiResponse::failed("unknown", format!("unknown action: {name}"))
            }
        }
    }

    /// Lock the session. A locked session is left alone: the OS login
    /// surface rejects synthetic input, so waking or unlocking it from
    /// software is not attempted.
    fn lock(&self) -> ApiResponse {
        if is_screen_locked(self.cap.as_ref()) {
            return ApiResponse::failed(
                "failed",
                "session is already locked; synthetic input cannot wake or unlock it",
            );
        }
        match self.cap.inject_key(Key::LockScreen) {
            Ok(()) => ApiResponse::ok("lock_success"),
            Err(e) => ApiResponse::failed("failed", e.to_string()),
        }
    }

    fn toggle(&self, app_name: &str) -> ApiResponse {
        let Some(app) = self.registry.get(app_name) else {
            return ApiResponse::failed("failed", format!("unknown app: {app_name}"));
        };

        // The reported transition comes from this pre-operation sample.
        // A concurrent external start/stop of the app can make it wrong;
        // that race is documented protocol behavior, not something to
        // re-confirm after the fact.
        let was_running = self.cap.is_process_running(&app.bundle_id);

        match self.lifecycle.toggle(self.cap.as_ref(), app, was_running) {
            Ok(()) => {
                if was_running {
                    ApiResponse::ok("closed")
                } else {
                    ApiResponse::ok("opened")
                }
            }
            Err(e) => ApiResponse::failed("failed", e.to_string()),
        }
    }
}

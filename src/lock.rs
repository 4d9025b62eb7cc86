//! Lock-state inference.
//!
//! The OS exposes no direct "is the session locked" query to this layer,
//! so lock state is inferred from foreground-process identity: the login
//! screen owns the foreground exactly while the session is locked. This
//! is a heuristic, not an authoritative signal - a process impersonating
//! the login-screen identity, or an OS release renaming it, will misreport.

use crate::capability::Capability;

/// Process identity of the system login screen.
pub const LOGIN_WINDOW_BUNDLE_ID: &str = "com.apple.loginwindow";

/// True iff the login screen is the foreground process.
pub fn is_screen_locked(cap: &dyn Capability) -> bool {
    match cap.foreground_process_id() {
        Some(id) => id == LOGIN_WINDOW_BUNDLE_ID,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, LaunchOutput};
    use crate::keys::Key;

    struct ForegroundOnly(Option<String>);

    impl Capability for ForegroundOnly {
        fn check_permission(&self) -> bool {
            true
        }
        fn request_permission(&self) {}
        fn inject_key(&self, _key: Key) -> Result<(), CapabilityError> {
            Ok(())
        }
        fn is_process_running(&self, _bundle_id: &str) -> bool {
            false
        }
        fn launch_process(&self, _path: &str) -> Result<LaunchOutput, CapabilityError> {
            Ok(LaunchOutput {
                exit_code: 0,
                stderr: String::new(),
            })
        }
        fn terminate_process(&self, _bundle_id: &str) -> bool {
            false
        }
        fn force_terminate_process(&self, _bundle_id: &str) -> bool {
            false
        }
        fn foreground_process_id(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[test]
    fn locked_when_login_window_is_frontmost() {
        let cap = ForegroundOnly(Some(LOGIN_WINDOW_BUNDLE_ID.to_string()));
        assert!(is_screen_locked(&cap));
    }

    #[test]
    fn unlocked_for_any_other_foreground_process() {
        let cap = ForegroundOnly(Some("com.apple.finder".to_string()));
        assert!(!is_screen_locked(&cap));
    }

    #[test]
    fn unknown_foreground_reads_as_unlocked() {
        let cap = ForegroundOnly(None);
        assert!(!is_screen_locked(&cap));
    }
}

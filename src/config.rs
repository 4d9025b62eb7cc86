//! Configuration loaded from environment variables at startup.
//!
//! Centralizes all DESKREMOTE_* env var access into a single Config struct,
//! providing a single source of truth with fail-fast validation.

use std::path::PathBuf;
use std::sync::Mutex;

/// Default control port, matching the documented wire examples.
pub const DEFAULT_PORT: u16 = 8888;

/// Global configuration instance, lazily initialized and resettable for tests.
static CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Configuration loaded from DESKREMOTE_* environment variables.
///
/// All environment variable access should go through this struct
/// rather than calling env::var directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base directory (DESKREMOTE_DIR or ~/.deskremote)
    pub base_dir: PathBuf,
    /// Control port (DESKREMOTE_PORT, default 8888)
    pub port: u16,
    /// Web root holding index.html and assets/ (DESKREMOTE_WEB_ROOT or <base>/web)
    pub web_root: PathBuf,
    /// Host advertised in the server URL (DESKREMOTE_ADVERTISE_HOST, default 127.0.0.1)
    pub advertise_host: String,
    /// OS generic launcher binary (DESKREMOTE_LAUNCHER, default /usr/bin/open)
    pub launcher: String,
}

impl Config {
    /// Initialize global config from environment variables (call once at startup).
    /// Can be called multiple times - subsequent calls are no-ops.
    pub fn init() {
        let mut config = CONFIG.lock().unwrap();
        if config.is_none() {
            *config = Some(Self::from_env());
        }
    }

    /// Get the global config, initializing from the environment on first
    /// access. `init()` at startup makes the load explicit; this fallback
    /// keeps late readers (logging from worker threads) safe.
    pub fn get() -> Config {
        CONFIG
            .lock()
            .unwrap()
            .get_or_insert_with(Self::from_env)
            .clone()
    }

    /// Reset global config (test-only).
    /// Allows tests to reinitialize config with different env vars.
    #[cfg(test)]
    pub fn reset() {
        *CONFIG.lock().unwrap() = None;
    }

    /// Load configuration from environment variables
    fn from_env() -> Self {
        use std::env;

        // DESKREMOTE_DIR: custom directory or ~/.deskremote
        let base_dir = if let Ok(dir) = env::var("DESKREMOTE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".deskremote")
        } else {
            PathBuf::from(".deskremote")
        };

        // DESKREMOTE_PORT: control port, default 8888 on absent or unparseable
        let port = env::var("DESKREMOTE_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        // DESKREMOTE_WEB_ROOT: where index.html and assets/ live
        let web_root = env::var("DESKREMOTE_WEB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("web"));

        // DESKREMOTE_ADVERTISE_HOST: host shown in the advertised URL
        let advertise_host =
            env::var("DESKREMOTE_ADVERTISE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        // DESKREMOTE_LAUNCHER: the OS generic launcher used to start apps
        let launcher =
            env::var("DESKREMOTE_LAUNCHER").unwrap_or_else(|_| "/usr/bin/open".to_string());

        Self {
            base_dir,
            port,
            web_root,
            advertise_host,
            launcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to set env var for test scope
    fn with_env<F>(key: &str, value: &str, f: F)
    where
        F: FnOnce(),
    {
        // SAFETY: Tests use serial_test to run single-threaded.
        // No data races possible when tests run serially.
        unsafe {
            env::set_var(key, value);
        }
        f();
        unsafe {
            env::remove_var(key);
        }
    }

    /// Helper to clear multiple env vars for test scope
    fn without_env<F>(keys: &[&str], f: F)
    where
        F: FnOnce(),
    {
        let saved: Vec<_> = keys.iter().map(|k| (k, env::var(k).ok())).collect();

        // SAFETY: Tests use serial_test to run single-threaded.
        // No data races possible when tests run serially.
        for key in keys {
            unsafe {
                env::remove_var(key);
            }
        }

        f();

        for (key, val) in saved {
            if let Some(v) = val {
                unsafe {
                    env::set_var(key, v);
                }
            }
        }
    }

    #[test]
    #[serial]
    fn default_config_uses_home_dir() {
        Config::reset();
        without_env(&["DESKREMOTE_DIR", "DESKREMOTE_WEB_ROOT"], || {
            Config::init();
            let config = Config::get();

            let expected = dirs::home_dir()
                .map(|h| h.join(".deskremote"))
                .unwrap_or_else(|| PathBuf::from(".deskremote"));
            assert_eq!(config.base_dir, expected);
            assert_eq!(config.web_root, expected.join("web"));
        });
    }

    #[test]
    #[serial]
    fn dir_env_overrides_home() {
        Config::reset();
        with_env("DESKREMOTE_DIR", "/custom/deskremote", || {
            without_env(&["DESKREMOTE_WEB_ROOT"], || {
                Config::init();
                let config = Config::get();
                assert_eq!(config.base_dir, PathBuf::from("/custom/deskremote"));
                assert_eq!(config.web_root, PathBuf::from("/custom/deskremote/web"));
            });
        });
    }

    #[test]
    #[serial]
    fn port_defaults_to_8888() {
        Config::reset();
        without_env(&["DESKREMOTE_PORT"], || {
            Config::init();
            assert_eq!(Config::get().port, 8888);
        });
    }

    #[test]
    #[serial]
    fn port_respects_env_var() {
        Config::reset();
        with_env("DESKREMOTE_PORT", "9100", || {
            Config::init();
            assert_eq!(Config::get().port, 9100);
        });
    }

    #[test]
    #[serial]
    fn unparseable_port_falls_back_to_default() {
        Config::reset();
        with_env("DESKREMOTE_PORT", "not-a-port", || {
            Config::init();
            assert_eq!(Config::get().port, 8888);
        });
    }

    #[test]
    #[serial]
    fn advertise_host_default_is_loopback() {
        Config::reset();
        without_env(&["DESKREMOTE_ADVERTISE_HOST"], || {
            Config::init();
            assert_eq!(Config::get().advertise_host, "127.0.0.1");
        });
    }

    #[test]
    #[serial]
    fn launcher_respects_env_var() {
        Config::reset();
        with_env("DESKREMOTE_LAUNCHER", "/usr/local/bin/open-wrapper", || {
            Config::init();
            assert_eq!(Config::get().launcher, "/usr/local/bin/open-wrapper");
        });
    }

    #[test]
    #[serial]
    fn reset_allows_reinit() {
        Config::reset();
        with_env("DESKREMOTE_ADVERTISE_HOST", "10.0.0.2", || {
            Config::init();
            assert_eq!(Config::get().advertise_host, "10.0.0.2");
        });

        Config::reset();
        with_env("DESKREMOTE_ADVERTISE_HOST", "10.0.0.3", || {
            Config::init();
            assert_eq!(Config::get().advertise_host, "10.0.0.3");
        });
    }
}

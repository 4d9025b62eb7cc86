//! Static app registry: logical name -> launch descriptor.
//!
//! Loaded once at startup and read-only thereafter. Lookups accept both
//! the system name ("douyin") and the display name ("抖音"); iteration
//! preserves registration order so diagnostic output is deterministic.

use std::collections::HashMap;

/// One registered application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDescriptor {
    /// System name used in action strings (toggle_<name>, status_<name>)
    pub name: String,
    /// Human-facing name
    pub display_name: String,
    /// OS-level identifier used to match running processes
    pub bundle_id: String,
    /// Absolute path handed to the OS launcher
    pub launch_path: String,
}

/// Immutable name -> descriptor mapping
pub struct AppRegistry {
    apps: Vec<AppDescriptor>,
    index: HashMap<String, usize>,
}

impl AppRegistry {
    /// Build a registry from descriptors, keyed by system and display name.
    pub fn new(apps: Vec<AppDescriptor>) -> Self {
        let mut index = HashMap::new();
        for (i, app) in apps.iter().enumerate() {
            index.insert(app.name.clone(), i);
            index.insert(app.display_name.clone(), i);
        }
        Self { apps, index }
    }

    /// The built-in registry.
    pub fn defaults() -> Self {
        Self::new(vec![
            AppDescriptor {
                name: "douyin".to_string(),
                display_name: "抖音".to_string(),
                bundle_id: "com.bytedance.douyin.desktop".to_string(),
                launch_path: "/Applications/抖音.app".to_string(),
            },
            AppDescriptor {
                name: "qishui".to_string(),
                display_name: "汽水音乐".to_string(),
                bundle_id: "com.soda.music".to_string(),
                launch_path: "/Applications/汽水音乐.app".to_string(),
            },
        ])
    }

    /// Look up a descriptor by system or display name.
    pub fn get(&self, name: &str) -> Option<&AppDescriptor> {
        self.index.get(name).map(|&i| &self.apps[i])
    }

    /// All registered apps in registration order (deduplicated).
    pub fn all(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.apps.iter()
    }
}

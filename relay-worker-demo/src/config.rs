//! The one place in this workspace that owns a file-backed configuration:
//! everything under `relay-core` takes configuration as constructor
//! arguments instead (spec SPEC_FULL §2 "Configuration").

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_derive::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub worker_count: usize,
    pub listen_addr: String,
    pub monitor_timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            worker_count: 2,
            listen_addr: "127.0.0.1:0".to_string(),
            monitor_timeout_ms: 500,
            max_retries: 3,
        }
    }
}

impl DemoConfig {
    /// Load from `path` if it exists, otherwise fall back to the documented
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => DemoConfig::default(),
        }
    }

    pub fn monitor_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor_timeout_ms)
    }
}

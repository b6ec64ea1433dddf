//! Plain configuration structs for the monitor, retry decorator, and
//! worker-bound delegates. Deliberately not builder types with `set_*`
//! chains: each is just a `Default`-able value struct a caller constructs
//! directly or deserializes with `serde` (via `serde_json`, already in the
//! dependency table).

use std::time::Duration;

use serde_derive::Deserialize;

/// Governs [`crate::monitor::TransportMonitor`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Age at which an unacknowledged send is considered timed out.
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig { timeout: Duration::from_millis(500) }
    }
}

/// Governs [`crate::retry::RetryTransport`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig { max_retries: 3 }
    }
}

/// Governs [`crate::async_delegate::BlockingAsyncDelegate`]'s default
/// deadline when a caller does not supply its own.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AsyncDelegateConfig {
    #[serde(with = "duration_millis")]
    pub default_deadline: Duration,
}

impl Default for AsyncDelegateConfig {
    fn default() -> Self {
        AsyncDelegateConfig { default_deadline: Duration::from_secs(5) }
    }
}

/// `serde` has no built-in `Duration <-> millis` mapping; this mirrors the
/// small inline (de)serialize-with modules the ambient stack favors over
/// adding a duration crate for one field shape.
mod duration_millis {
    use serde::{Deserializer, Serializer};
    use serde::Deserialize;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! Tunables for the handle registry.
//!
//! Deserialized from the `[bridge]` section of the relay config file.

use serde::Deserialize;

const DEFAULT_ANOMALY_LOG_CAPACITY: usize = 256;

/// Level at which orphaned callbacks are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanLogLevel {
    #[default]
    Warn,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// How many recent anomalies the registry keeps for inspection.
    pub anomaly_log_capacity: usize,
    pub orphan_log_level: OrphanLogLevel,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            anomaly_log_capacity: DEFAULT_ANOMALY_LOG_CAPACITY,
            orphan_log_level: OrphanLogLevel::default(),
        }
    }
}

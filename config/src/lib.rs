//! Configuration for relay.
//!
//! Read from `~/.relay/config.toml`, or from the file named by `RELAY_CONFIG`.
//!
//! ```toml
//! [bridge]
//! anomaly_log_capacity = 256
//! orphan_log_level = "warn"   # or "debug"
//!
//! [log]
//! filter = "relay_core=debug,info"
//!
//! [demo]
//! player_id = "${USER}"
//! registered = false
//! latency_ms = 25
//!
//! [[demo.products]]
//! sku = "gems_100"
//! name = "100 Gems"
//! price = 0.99
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use relay_core::BridgeSettings;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "RELAY_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bridge: BridgeSettings,
    pub log: LogConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Settings for the simulated foreign environment the binary runs against.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub player_id: String,
    pub registered: bool,
    /// Delay before each simulated callback.
    pub latency_ms: u64,
    pub products: Vec<DemoProduct>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            player_id: "playerId".to_string(),
            registered: true,
            latency_ms: 25,
            products: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemoProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

/// Replace `${VAR}` with the value of `VAR` (empty if unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

impl RelayConfig {
    /// Load the config file, falling back to defaults.
    ///
    /// A missing file is not an error. An unreadable or malformed one is
    /// logged and ignored.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{err}; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.expanded())
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    fn expanded(mut self) -> Self {
        self.demo.player_id = expand_env_vars(&self.demo.player_id);
        self.log.filter = self.log.filter.as_deref().map(expand_env_vars);
        self
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".relay").join("config.toml"))
}

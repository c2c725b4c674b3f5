//! Runtime configuration.
//!
//! Every knob has a default; a JSON document only needs to name the values
//! it overrides.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Change log sizing for the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Entries kept before the log is trimmed.
    pub change_log_cap: usize,
    /// Oldest entries dropped per trim.
    pub change_log_trim: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            change_log_cap: 2000,
            change_log_trim: 1000,
        }
    }
}

/// Reconciler and driver limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// How many previous siblings a keyed child searches forward.
    pub key_window: usize,
    /// Render passes allowed before the loop is declared infinite.
    pub max_update_iterations: usize,
    /// Detached handles kept per pool.
    pub pool_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            key_window: 10,
            max_update_iterations: 256,
            pool_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = Config::from_json(r#"{"render": {"key_window": 4}}"#).unwrap();
        assert_eq!(config.render.key_window, 4);
        assert_eq!(config.render.max_update_iterations, 256);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            Config::from_json("{not json"),
            Err(Error::Config(_))
        ));
    }
}

//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Knobs for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Log a warning when a readonly view or a setter-less computed refuses
    /// a write. Warnings are only ever emitted in debug builds.
    pub warn_readonly_mutations: bool,

    /// Number of entries the dependency graph and identity registry may hold
    /// before dead entries are swept. The mark doubles with live size.
    pub sweep_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            warn_readonly_mutations: true,
            sweep_threshold: 64,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn should_warn(&self) -> bool {
        cfg!(debug_assertions) && self.warn_readonly_mutations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{"sweep_threshold": 8}"#).unwrap();
        assert_eq!(config.sweep_threshold, 8);
        assert!(config.warn_readonly_mutations);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(RuntimeConfig::from_json_str("{").is_err());
    }
}

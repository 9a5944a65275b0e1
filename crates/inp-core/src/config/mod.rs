//! Configuration
//!
//! - [`EngineConfig`]: matcher limits and the per-call step budget
//! - [`types`]: the YAML schema file format
//! - [`loader`]: reading schema files from a directory

pub mod loader;
pub mod types;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment override for [`EngineConfig::step_budget_factor`].
pub const STEP_BUDGET_FACTOR_ENV: &str = "INP_STEP_BUDGET_FACTOR";

/// Environment override for [`EngineConfig::max_input_bytes`].
pub const MAX_INPUT_BYTES_ENV: &str = "INP_MAX_INPUT_BYTES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Matcher work allowed per input byte in one parse call
    pub step_budget_factor: usize,
    /// Longer inputs are rejected before any matching
    pub max_input_bytes: usize,
    /// Compiled size limit for each schema matcher
    pub regex_size_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget_factor: 64,
            max_input_bytes: 1 << 20,
            regex_size_limit: 16 << 20,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `INP_STEP_BUDGET_FACTOR` and `INP_MAX_INPUT_BYTES`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(STEP_BUDGET_FACTOR_ENV) {
            config.step_budget_factor = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", STEP_BUDGET_FACTOR_ENV, value))?;
        }
        if let Ok(value) = std::env::var(MAX_INPUT_BYTES_ENV) {
            config.max_input_bytes = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", MAX_INPUT_BYTES_ENV, value))?;
        }
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse engine configuration")
    }

    /// Steps allowed for one call over `input_len` bytes.
    pub fn step_budget(&self, input_len: usize) -> usize {
        self.step_budget_factor.saturating_mul(input_len.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.step_budget_factor, 64);
        assert_eq!(config.max_input_bytes, 1 << 20);
        assert_eq!(config.step_budget(10), 640);
        assert_eq!(config.step_budget(0), 64);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml("step_budget_factor: 8\n").unwrap();
        assert_eq!(config.step_budget_factor, 8);
        assert_eq!(config.max_input_bytes, EngineConfig::default().max_input_bytes);
    }

    #[test]
    fn test_bad_yaml_is_reported() {
        let err = EngineConfig::from_yaml("step_budget_factor: lots\n").unwrap_err();
        assert!(format!("{:#}", err).contains("engine configuration"));
    }
}

//! Engine configuration with documented constants
//!
//! The tunables of the progression engine live here. Skill-specific numbers
//! (base experience, interval length, drop tables) belong to the catalog.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{EngineError, Result};

/// Configuration for the progression engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the local countdown tick (milliseconds)
    ///
    /// Ticks only refresh the timer view and detect local expiry.
    /// At 1000 the countdown updates once per second.
    pub tick_period_ms: u64,

    /// Delay before an attached engine retries a failed completion (milliseconds)
    pub retry_delay_ms: u64,

    /// Probability that a completion yields one item from the common table
    pub common_drop_chance: f64,

    /// Probability that a completion yields one item from the rare table
    ///
    /// Rolled independently of the common table, so both can hit.
    pub rare_drop_chance: f64,

    /// Highest level the curve reports
    pub max_level: u32,

    /// Buffer size of the engine event channel
    ///
    /// Slow subscribers lose the oldest events once the buffer is full.
    pub event_capacity: usize,

    /// Seed for drop rolls. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1000,
            retry_delay_ms: 5000,
            common_drop_chance: 0.5,
            rare_drop_chance: 0.05,
            max_level: 99,
            event_capacity: 256,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tick_period_ms == 0 {
            return Err("tick_period_ms must be positive".into());
        }
        if self.retry_delay_ms == 0 {
            return Err("retry_delay_ms must be positive".into());
        }

        for (name, chance) in [
            ("common_drop_chance", self.common_drop_chance),
            ("rare_drop_chance", self.rare_drop_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(format!("{} ({}) must be within 0.0..=1.0", name, chance));
            }
        }

        if self.max_level == 0 {
            return Err("max_level must be at least 1".into());
        }

        if self.event_capacity == 0 {
            return Err("event_capacity must be at least 1".into());
        }

        Ok(())
    }

    /// Parse and validate a config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate().map_err(EngineError::Config)?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Get the process-wide engine config (initializes with defaults if not set)
pub fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::default)
}

/// Set the process-wide engine config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: EngineConfig) -> std::result::Result<(), EngineConfig> {
    CONFIG.set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_drop_chances() {
        let config = EngineConfig::default();
        assert_eq!(config.common_drop_chance, 0.5);
        assert_eq!(config.rare_drop_chance, 0.05);
    }

    #[test]
    fn test_rejects_out_of_range_chance() {
        let config = EngineConfig {
            rare_drop_chance: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_tick_period() {
        let config = EngineConfig {
            tick_period_ms: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_retry_delay() {
        let config = EngineConfig {
            retry_delay_ms: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("tick_period_ms = 250\nrng_seed = 7\n").unwrap();
        assert_eq!(config.tick_period_ms, 250);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.max_level, 99);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("common_drop_chance = 2.0").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}

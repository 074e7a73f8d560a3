//! Configuration loading for the propagation engine.
//!
//! Settings are read from a TOML file. Every section falls back to its defaults,
//! so a file only needs the keys it wants to change.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::propagation::PropagationConfig;
use crate::saturation::SaturationConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub saturation: SaturationConfig,
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.propagation.validate()?;
        self.saturation.validate()
    }
}

/// Default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Loreweave engine configuration

[propagation]
# Per-hop falloff rate k
decay_constant = 0.8
# "exponential" (exp(-k*h)) or "linear" (max(0, 1 - k*h))
decay_curve = "exponential"
# Effective probabilities below this are dropped without rolling
min_probability = 0.01

[saturation]
max_stories_per_tile = 50
max_events_per_tile = 20
# Fraction of a cap at which soft-cap hints fire
soft_cap_ratio = 0.8
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::DecayCurve;

    #[test]
    fn test_default_config_toml_parses() {
        let parsed = EngineConfig::from_str(&default_config_toml()).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = EngineConfig::from_str(
            r#"
[propagation]
decay_curve = "linear"
"#,
        )
        .unwrap();

        assert_eq!(parsed.propagation.decay_curve, DecayCurve::Linear);
        assert_eq!(parsed.propagation.decay_constant, 0.8);
        assert_eq!(parsed.saturation.max_events_per_tile, 20);
    }

    #[test]
    fn test_empty_config() {
        let parsed = EngineConfig::from_str("").unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_str("[propagation]\ndecay_constant = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "propagation.decay_constant", .. }
        ));

        let err = EngineConfig::from_str("[saturation]\nsoft_cap_ratio = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("soft_cap_ratio"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_str("[propagation\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = EngineConfig::default();
        config.saturation.max_stories_per_tile = 12;

        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_str(&text).unwrap(), config);
    }

    #[test]
    fn test_from_missing_file() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/loreweave.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

//! YAML configuration loader for the risk engine.
//!
//! Operators can override scoring weights, velocity thresholds, and the
//! playbook set from a single `risk.yaml` file. Every section is optional;
//! omitted sections fall back to the built-in defaults. Loaded values are
//! consumed through `RiskScorer::from_config` and
//! `PlaybookRegistry::from_config`.

use crate::playbook::ResponsePlaybook;
use crate::profile::DEFAULT_LEARNING_WINDOW_DAYS;
use crate::risk::{RiskWeights, WeightError};
use crate::signals::VelocityThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid scoring weights for {profile}: {source}")]
    InvalidWeights {
        profile: &'static str,
        source: WeightError,
    },

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Top-level risk engine configuration matching the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Scoring weight overrides per assessment profile.
    #[serde(default)]
    pub weights: WeightsConfig,
    /// Velocity window thresholds.
    #[serde(default)]
    pub velocity: VelocityConfig,
    /// Days of transaction history consulted when rebuilding a profile.
    #[serde(default = "default_learning_window_days")]
    pub learning_window_days: i64,
    /// Playbooks that replace the built-in registry when present.
    #[serde(default)]
    pub playbooks: Vec<ResponsePlaybook>,
}

fn default_learning_window_days() -> i64 {
    DEFAULT_LEARNING_WINDOW_DAYS
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            velocity: VelocityConfig::default(),
            learning_window_days: DEFAULT_LEARNING_WINDOW_DAYS,
            playbooks: Vec::new(),
        }
    }
}

/// Weight overrides for the two assessment profiles.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeightsConfig {
    #[serde(default)]
    pub fraud: Option<RiskWeights>,
    #[serde(default)]
    pub authentication: Option<RiskWeights>,
}

/// Velocity threshold configuration from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// Maximum events per sliding hour before the velocity signal saturates.
    pub max_txn_per_hour: u64,
    /// Maximum summed amount per sliding hour.
    pub max_amount_per_hour: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        let defaults = VelocityThresholds::default();
        Self {
            max_txn_per_hour: defaults.max_txn_per_hour,
            max_amount_per_hour: defaults.max_amount_per_hour,
        }
    }
}

impl From<VelocityConfig> for VelocityThresholds {
    fn from(config: VelocityConfig) -> Self {
        VelocityThresholds {
            max_txn_per_hour: config.max_txn_per_hour,
            max_amount_per_hour: config.max_amount_per_hour,
        }
    }
}

impl RiskConfig {
    /// Effective fraud weights: the override if present, else the defaults.
    pub fn fraud_weights(&self) -> RiskWeights {
        self.weights.fraud.clone().unwrap_or_else(RiskWeights::fraud)
    }

    /// Effective authentication weights.
    pub fn authentication_weights(&self) -> RiskWeights {
        self.weights
            .authentication
            .clone()
            .unwrap_or_else(RiskWeights::authentication)
    }
}

/// Loads and parses the risk engine configuration from a YAML file.
pub fn load_risk_config(path: &Path) -> Result<RiskConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: RiskConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates the loaded configuration.
fn validate_config(config: &RiskConfig) -> Result<(), ConfigError> {
    if let Some(weights) = &config.weights.fraud {
        weights.validate().map_err(|source| ConfigError::InvalidWeights {
            profile: "fraud",
            source,
        })?;
    }
    if let Some(weights) = &config.weights.authentication {
        weights
            .validate()
            .map_err(|source| ConfigError::InvalidWeights {
                profile: "authentication",
                source,
            })?;
    }

    if config.velocity.max_txn_per_hour == 0 {
        return Err(ConfigError::InvalidValue(
            "velocity.max_txn_per_hour must be positive".to_string(),
        ));
    }
    if !(config.velocity.max_amount_per_hour > 0.0) {
        return Err(ConfigError::InvalidValue(
            "velocity.max_amount_per_hour must be positive".to_string(),
        ));
    }
    if config.learning_window_days <= 0 {
        return Err(ConfigError::InvalidValue(
            "learning_window_days must be positive".to_string(),
        ));
    }

    for playbook in &config.playbooks {
        if playbook.id.is_empty() {
            return Err(ConfigError::InvalidValue(
                "playbooks[].id must not be empty".to_string(),
            ));
        }
        if playbook.automated_actions.is_empty() && playbook.manual_steps.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "playbook '{}' defines no actions",
                playbook.id
            )));
        }
    }

    Ok(())
}

//! Top-level configuration.
//!
//! One [`CoreConfig`] carries everything the store and orchestrator need.
//! It is normally loaded from TOML and handed to the constructors; nothing
//! in the crate reads the environment.
//!
//! ```rust
//! use qcore_state::config::CoreConfig;
//! use qcore_state::store::VersionPolicy;
//!
//! let config = CoreConfig::from_toml_str(
//!     r#"
//!     [store]
//!     max_subscribers = 8
//!
//!     [cycle]
//!     tick_interval_ms = 250
//!     version_policy = "strict"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.store.max_subscribers, 8);
//! assert_eq!(config.store.queue_capacity, 64);
//! assert_eq!(config.cycle.version_policy, VersionPolicy::Strict);
//! ```

use crate::orchestrator::CycleConfig;
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use stillwater::{NonEmptyVec, Validation};
use thiserror::Error;

/// Errors produced while loading configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or has the wrong shape
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// One or more values are out of range; every problem is listed
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

type Check = Validation<(), NonEmptyVec<String>>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub store: StoreConfig,
    pub cycle: CycleConfig,
}

impl CoreConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let store = &self.store;
        let health = &store.health;

        let checks = vec![
            check(store.queue_capacity > 0, "store.queue_capacity must be at least 1"),
            check(store.max_subscribers > 0, "store.max_subscribers must be at least 1"),
            check(
                store.notify_timeout_ms > 0,
                "store.notify_timeout_ms must be greater than 0",
            ),
            check(
                is_fraction(health.max_conflict_ratio),
                "store.health.max_conflict_ratio must be within 0.0..=1.0",
            ),
            check(
                is_fraction(health.warn_conflict_ratio),
                "store.health.warn_conflict_ratio must be within 0.0..=1.0",
            ),
            check(
                health.warn_conflict_ratio <= health.max_conflict_ratio,
                "store.health.warn_conflict_ratio must not exceed max_conflict_ratio",
            ),
            check(
                is_fraction(health.subscriber_warn_fraction),
                "store.health.subscriber_warn_fraction must be within 0.0..=1.0",
            ),
            check(
                is_fraction(health.max_missed_ratio),
                "store.health.max_missed_ratio must be within 0.0..=1.0",
            ),
            check(
                self.cycle.tick_interval_ms > 0,
                "cycle.tick_interval_ms must be greater than 0",
            ),
        ];

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(problems) => Err(ConfigError::Invalid(problems.into_vec())),
        }
    }
}

fn check(ok: bool, message: &str) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(message.to_string())
    }
}

fn is_fraction(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VersionPolicy;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.cycle.version_policy, VersionPolicy::Repair);
    }

    #[test]
    fn nested_health_thresholds_parse() {
        let config = CoreConfig::from_toml_str(
            r#"
            [store.health]
            stale_after_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.store.health.stale_after_ms, 5000);
        assert_eq!(config.store.health.max_conflict_ratio, 0.10);
    }

    #[test]
    fn validation_reports_every_problem() {
        let err = CoreConfig::from_toml_str(
            r#"
            [store]
            queue_capacity = 0
            max_subscribers = 0

            [store.health]
            max_conflict_ratio = 1.5

            [cycle]
            tick_interval_ms = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Invalid(problems) => {
                assert_eq!(problems.len(), 4);
                assert!(problems[0].contains("queue_capacity"));
                assert!(problems[3].contains("tick_interval_ms"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            CoreConfig::from_toml_str("[store\nqueue_capacity = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CoreConfig::from_toml_str("[cycle]\nversion_policy = \"sometimes\""),
            Err(ConfigError::Parse(_))
        ));
    }
}

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".emergence";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid {field}: {value}. Must be within {range}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },

    #[error(
        "Invalid similarity cutoffs: novel_cutoff ({0}) must be below duplicate_cutoff ({1})"
    )]
    InvalidCutoffs(f64, f64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

fn check_fraction(field: &'static str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let ok = value.is_finite() && value <= 1.0 && if allow_zero { value >= 0.0 } else { value > 0.0 };
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            range: if allow_zero { "[0, 1]" } else { "(0, 1]" },
        })
    }
}

fn check_positive<T: Into<u64> + Copy>(field: &'static str, value: T) -> Result<(), ConfigError> {
    let value: u64 = value.into();
    if value == 0 {
        Err(ConfigError::OutOfRange {
            field,
            value: "0".to_string(),
            range: "[1, ...)",
        })
    } else {
        Ok(())
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .emergence/config.yaml (project config, created by init)
    /// 3. .emergence/local.yaml (project local overrides, optional)
    /// 4. Environment variables (EMERGENCE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Load with `config.yaml` and `local.yaml` taken from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Self::figment(dir)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("EMERGENCE_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        check_positive("rate_limit.requests_per_window", config.rate_limit.requests_per_window)?;
        check_positive("rate_limit.window_secs", config.rate_limit.window_secs)?;

        check_fraction("gate.threshold", config.gate.threshold, true)?;

        check_fraction("classifier.confidence_floor", config.classifier.confidence_floor, true)?;
        check_fraction("classifier.secondary_ratio", config.classifier.secondary_ratio, false)?;

        let practice = &config.practice;
        check_positive("practice.generation_attempts", practice.generation_attempts)?;
        check_positive("practice.solution_timeout_secs", practice.solution_timeout_secs)?;
        check_positive("practice.consistency_runs", practice.consistency_runs)?;
        check_fraction("practice.divergence_threshold", practice.divergence_threshold, true)?;
        check_positive("practice.success_streak", practice.success_streak)?;
        check_positive("practice.failure_streak", practice.failure_streak)?;
        check_positive("practice.max_difficulty", practice.max_difficulty)?;

        let crystallizer = &config.crystallizer;
        check_positive("crystallizer.bootstrap_threshold", crystallizer.bootstrap_threshold)?;
        check_positive("crystallizer.steady_threshold", crystallizer.steady_threshold)?;
        if crystallizer.sample_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "crystallizer.sample_size",
                value: "0".to_string(),
                range: "[1, ...)",
            });
        }
        check_fraction("crystallizer.duplicate_cutoff", crystallizer.duplicate_cutoff, false)?;
        check_fraction("crystallizer.novel_cutoff", crystallizer.novel_cutoff, true)?;
        if crystallizer.novel_cutoff >= crystallizer.duplicate_cutoff {
            return Err(ConfigError::InvalidCutoffs(
                crystallizer.novel_cutoff,
                crystallizer.duplicate_cutoff,
            ));
        }

        if config.strategy.token_budget == 0 {
            return Err(ConfigError::OutOfRange {
                field: "strategy.token_budget",
                value: "0".to_string(),
                range: "[1, ...)",
            });
        }
        check_fraction("strategy.prune_target_ratio", config.strategy.prune_target_ratio, false)?;
        if config.strategy.min_age_days < 0 {
            return Err(ConfigError::OutOfRange {
                field: "strategy.min_age_days",
                value: config.strategy.min_age_days.to_string(),
                range: "[0, ...)",
            });
        }

        check_positive("random.timeout_ms", config.random.timeout_ms)?;
        if let Some(endpoint) = &config.random.endpoint {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "random.endpoint cannot be blank; omit it to use the local generator".to_string(),
                ));
            }
        }

        if config.judgment.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "judgment.model cannot be empty".to_string(),
            ));
        }
        check_positive("judgment.max_tokens", config.judgment.max_tokens)?;

        if config.oracle.interpreter.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "oracle.interpreter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

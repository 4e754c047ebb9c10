//! Layer configuration, loaded from YAML.
//!
//! ```yaml
//! identifier_policy: quote
//! batch:
//!   batch_size: 500
//!   param_budget: 32766
//! logging:
//!   slow_query_ms: 2000
//!   label: orders-db
//! ```
//!
//! Every key is optional. After loading, `SQLINQ_*` environment variables
//! override individual keys (the dotted key upper-cased with `.` replaced
//! by `_`, e.g. `SQLINQ_BATCH_BATCH_SIZE`).

use std::path::Path;

use serde::Deserialize;

use crate::batch::{DEFAULT_BATCH_SIZE, DEFAULT_PARAM_BUDGET};
use crate::error::DataError;
use crate::log::DEFAULT_SLOW_QUERY;
use crate::query::IdentifierPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub identifier_policy: IdentifierPolicy,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub param_budget: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            param_budget: DEFAULT_PARAM_BUDGET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub slow_query_ms: u64,
    pub log_args: bool,
    pub label: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            slow_query_ms: DEFAULT_SLOW_QUERY.as_millis() as u64,
            log_args: true,
            label: None,
        }
    }
}

const ENV_PREFIX: &str = "SQLINQ_";

impl DataConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, DataError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| DataError::configuration(format!("invalid data config: {e}")))
    }

    /// Load from a YAML file; a missing file yields the defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from a file, then apply `SQLINQ_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let mut config = Self::from_yaml_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DataError> {
        if let Some(v) = lookup(&env_key("identifier_policy")) {
            self.identifier_policy = serde_yaml::from_str(&v)
                .map_err(|e| DataError::configuration(format!("identifier_policy: {e}")))?;
        }
        if let Some(v) = lookup(&env_key("batch.batch_size")) {
            self.batch.batch_size = parse_override("batch.batch_size", &v)?;
        }
        if let Some(v) = lookup(&env_key("batch.param_budget")) {
            self.batch.param_budget = parse_override("batch.param_budget", &v)?;
        }
        if let Some(v) = lookup(&env_key("logging.slow_query_ms")) {
            self.logging.slow_query_ms = parse_override("logging.slow_query_ms", &v)?;
        }
        if let Some(v) = lookup(&env_key("logging.log_args")) {
            self.logging.log_args = parse_override("logging.log_args", &v)?;
        }
        if let Some(v) = lookup(&env_key("logging.label")) {
            self.logging.label = Some(v);
        }
        Ok(())
    }
}

fn env_key(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.replace('.', "_").to_uppercase())
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, DataError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| DataError::configuration(format!("{key}: cannot parse `{raw}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DataConfig::from_yaml_str("").unwrap();
        assert_eq!(config.batch.batch_size, 1000);
        assert_eq!(config.batch.param_budget, 16384);
        assert_eq!(config.logging.slow_query_ms, 5000);
        assert_eq!(config.identifier_policy, IdentifierPolicy::Validate);
    }

    #[test]
    fn test_partial_yaml() {
        let config = DataConfig::from_yaml_str(
            "identifier_policy: quote\nbatch:\n  batch_size: 250\nlogging:\n  label: orders\n",
        )
        .unwrap();
        assert_eq!(config.identifier_policy, IdentifierPolicy::Quote);
        assert_eq!(config.batch.batch_size, 250);
        assert_eq!(config.batch.param_budget, 16384);
        assert_eq!(config.logging.label.as_deref(), Some("orders"));
    }

    #[test]
    fn test_invalid_yaml_is_configuration_error() {
        let err = DataConfig::from_yaml_str("batch: [1, 2").unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SQLINQ_BATCH_BATCH_SIZE", "10"),
            ("SQLINQ_LOGGING_LOG_ARGS", "false"),
        ]
        .into_iter()
        .collect();
        let mut config = DataConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.batch.batch_size, 10);
        assert!(!config.logging.log_args);

        let bad: HashMap<&str, &str> = [("SQLINQ_BATCH_PARAM_BUDGET", "lots")].into_iter().collect();
        let err = config
            .apply_overrides(|k| bad.get(k).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DataConfig::from_yaml_file(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, DataConfig::default());

        let path = dir.path().join("data.yaml");
        std::fs::write(&path, "batch:\n  param_budget: 999\n").unwrap();
        assert_eq!(DataConfig::from_yaml_file(&path).unwrap().batch.param_budget, 999);
    }
}

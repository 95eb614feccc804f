use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

pub const DEFAULT_PRIMARY_FLUSH_ROWS: usize = 100_000;
pub const DEFAULT_REFERENCE_FLUSH_ROWS: usize = 25_000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Reader configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Rows decoded between cache flushes for primary statements
    #[validate(range(
        min = 1,
        max = 10_000_000,
        message = "Primary flush rows must be between 1 and 10000000"
    ))]
    pub primary_flush_rows: usize,

    /// Rows decoded between reference flushes
    #[validate(range(
        min = 1,
        max = 10_000_000,
        message = "Reference flush rows must be between 1 and 10000000"
    ))]
    pub reference_flush_rows: usize,

    /// Build and log statements without executing them
    pub skip_execution: bool,

    /// Cap on rows per primary statement. References are not linked on a
    /// capped read.
    #[validate(range(min = 1, message = "Row limit must be at least 1"))]
    pub row_limit: Option<u64>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            primary_flush_rows: DEFAULT_PRIMARY_FLUSH_ROWS,
            reference_flush_rows: DEFAULT_REFERENCE_FLUSH_ROWS,
            skip_execution: false,
            row_limit: None,
        }
    }
}

impl ReaderConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            primary_flush_rows: parse_env_var("RELMAP_PRIMARY_FLUSH_ROWS", "100000")?,
            reference_flush_rows: parse_env_var("RELMAP_REFERENCE_FLUSH_ROWS", "25000")?,
            skip_execution: parse_env_var("RELMAP_SKIP_EXECUTION", "false")?,
            row_limit: parse_optional_env_var("RELMAP_ROW_LIMIT")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

fn parse_optional_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse().map(Some).map_err(|e| ConfigError::Parse {
                field: key.to_string(),
                value,
                source: Box::new(e),
            })
        }
        _ => Ok(None),
    }
}

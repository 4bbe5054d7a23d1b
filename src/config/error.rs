//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to write configuration file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A numeric transport or serial setting the port cannot run with.
    #[error("'{key}' is {value}, the port needs at least {min}")]
    BelowMinimum {
        key: &'static str,
        value: u64,
        min: u64,
    },

    /// `logging.level` is not a valid tracing filter directive.
    #[error("Invalid log filter '{level}': {reason}")]
    InvalidLogLevel { level: String, reason: String },

    /// A `ZIGBEE_PORT_*` override could not be parsed.
    #[error("Environment override {var}='{value}' is not a valid {expected}")]
    EnvOverride {
        var: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub fn below_minimum(key: &'static str, value: impl Into<u64>, min: u64) -> Self {
        Self::BelowMinimum {
            key,
            value: value.into(),
            min,
        }
    }

    pub fn env_override(
        var: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::EnvOverride {
            var: var.into(),
            value: value.into(),
            expected,
        }
    }

    /// Dotted key of the offending setting, when the error concerns one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::BelowMinimum { key, .. } => Some(*key),
            Self::InvalidLogLevel { .. } => Some("logging.level"),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

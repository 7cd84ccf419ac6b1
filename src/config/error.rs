//! Errors raised while loading, validating or saving configuration.

use crate::error::SerialError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `[serial.defaults]` would be rejected by every open.
    #[error("Invalid [serial.defaults]: {0}")]
    InvalidDefaults(#[source] SerialError),

    /// A `[worker]` value outside its domain.
    #[error("Invalid worker.{key}: {reason}")]
    InvalidWorker { key: &'static str, reason: String },

    /// An override variable is set but cannot be parsed.
    #[error("Environment variable {var}={value:?} is not a valid {expected}")]
    Env {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// `save()` on a loader that was not loaded from a file.
    #[error("No config file path to save to")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

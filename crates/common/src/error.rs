//! Error types for ragcheck

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration and fixtures
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Fixture parse error: {0}")]
    FixtureParse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Fixture file not found: {}", path.display())]
    FixtureNotFound { path: PathBuf },

    #[error("Unknown selector role: {0}")]
    UnknownRole(String),
}

impl Error {
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

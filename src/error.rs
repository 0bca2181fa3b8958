//! Error types for engine construction and reporting

use std::path::PathBuf;
use thiserror::Error;

/// Errors in the engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse \"{0}\" into VAR=VALUE")]
    MalformedOutputFilter(String),

    #[error("Call-stack attribution requires per-function reporting")]
    CallStackWithoutPerFunction,

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the engine and the process-global runtime
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),

    #[error("Runtime already initialized")]
    AlreadyInitialized,

    #[error("Runtime not initialized")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, EngineError>;

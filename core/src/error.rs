//! Crate-level errors
//!
//! Failures of the program being run are values inside the engine
//! ([`crate::executor::ErrorInfo`]). This type covers everything around it:
//! configuration, loading programs and driving them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for crate-level operations
pub type Result<T> = std::result::Result<T, StrataError>;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config file not found: {0:?}")]
    ConfigNotFound(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid program: {0}")]
    Program(#[from] serde_json::Error),

    #[error("task budget of {0} exceeded, the program may be looping")]
    TaskBudgetExceeded(usize),
}

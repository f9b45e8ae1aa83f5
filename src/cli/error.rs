//! CLI-specific error types

use statcast_loader::{ConfigError, DatabaseError, PipelineError};
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read credentials: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("Failed to start runtime: {0}")]
    Runtime(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Pipeline(e.into())
    }
}

impl From<DatabaseError> for CliError {
    fn from(e: DatabaseError) -> Self {
        CliError::Pipeline(e.into())
    }
}

impl CliError {
    /// Error class printed before the message
    pub fn classification(&self) -> &'static str {
        match self {
            CliError::Prompt(_) => "CredentialError",
            CliError::Runtime(_) => "RuntimeError",
            CliError::Pipeline(e) => e.classification(),
        }
    }
}

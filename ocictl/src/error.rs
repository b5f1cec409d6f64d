use std::path::PathBuf;

use ociclient::StoreError;
use ociclient::auth::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Failed to decode annotation file {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to resolve {reference}: {source}")]
    Resolve {
        reference: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Push(anyhow::Error),

    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Settings(err.to_string())
    }
}

// ABOUTME: Application-wide error types for slipway.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::deploy::DeployError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing required setting: {0}")]
    MissingField(&'static str),

    #[error("no credentials for {0}: set private_key or password")]
    MissingCredentials(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

impl Error {
    /// True for problems found before any connection is attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound(_)
                | Error::UnknownEnvironment(_)
                | Error::MissingField(_)
                | Error::MissingCredentials(_)
                | Error::MissingEnvVar(_)
                | Error::InvalidConfig(_)
                | Error::Yaml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

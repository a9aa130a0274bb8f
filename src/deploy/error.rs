use crate::remote::RemoteExecutionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Workspace preparation failed on {host}: {source}")]
    Prepare {
        host: String,
        #[source]
        source: RemoteExecutionError,
    },

    #[error("Pre-flight validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pre-flight inspection aborted: {0}")]
    PreflightAborted(#[from] tokio::task::JoinError),
}

/// One artifact's install script failed. The rest of the run continues.
#[derive(Debug, Error)]
#[error("Install of {artifact} failed: {source}")]
pub struct InstallError {
    pub artifact: String,
    #[source]
    pub source: RemoteExecutionError,
}

pub type Result<T> = std::result::Result<T, DeployError>;

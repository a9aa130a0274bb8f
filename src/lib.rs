//! Release Deploy - GitHub release artifact deployment over ssh
//!
//! This crate resolves the latest release artifacts of GitHub repositories,
//! copies them to a single remote host concurrently and installs the
//! executables they contain, keeping the previous versions in `bin.old/`.

pub mod cli;
pub mod config;
pub mod deploy;
pub mod remote;
pub mod resolver;
pub mod types;

pub use config::{ConfigError, DeployConfig};
pub use deploy::{DeployError, DeploymentOrchestrator, OrchestratorOptions, RunReport};
pub use types::*;

//! Deployment configuration.
//!
//! Values come from an optional YAML file and are then overridden by
//! command-line flags. Validation runs before any remote interaction.

use crate::deploy::OrchestratorOptions;
use crate::remote::{script, SshOptions, TransferMethod};
use crate::types::{
    RemoteTarget, RemoteWorkspace, DEFAULT_ACTIVATION_DIR, DEFAULT_ACTIVATION_OWNER,
    DEFAULT_HOME_DIR, DEFAULT_SSH_USER,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {reason}")]
    InvalidYaml { path: String, reason: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Private key {path} is not readable: {source}")]
    KeyUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Required tool `{tool}` not found on PATH")]
    ToolMissing { tool: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: String,
    pub key_path: Option<PathBuf>,
    pub home_dir: String,
    pub activation_dir: String,
    /// `owner:group` for activated binaries; null skips `chown`.
    pub activation_owner: Option<String>,
    pub transfer_method: TransferMethod,
    pub no_clobber: bool,
    pub max_concurrent_transfers: Option<usize>,
    pub transfer_retries: u32,
    pub retry_backoff_ms: u64,
    pub verify_checksums: bool,
    pub connect_timeout_secs: u64,
    pub strict_host_key_checking: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let ssh = SshOptions::default();
        Self {
            host: None,
            port: None,
            user: DEFAULT_SSH_USER.to_string(),
            key_path: None,
            home_dir: DEFAULT_HOME_DIR.to_string(),
            activation_dir: DEFAULT_ACTIVATION_DIR.to_string(),
            activation_owner: Some(DEFAULT_ACTIVATION_OWNER.to_string()),
            transfer_method: TransferMethod::default(),
            no_clobber: false,
            max_concurrent_transfers: None,
            transfer_retries: 0,
            retry_backoff_ms: 500,
            verify_checksums: true,
            connect_timeout_secs: ssh.connect_timeout_secs,
            strict_host_key_checking: ssh.strict_host_key_checking,
        }
    }
}

impl DeployConfig {
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    /// Check everything that can be checked locally. `local_only` skips the
    /// ssh-specific settings for `--localhost` runs.
    pub fn validate(&self, local_only: bool) -> Result<(), ConfigError> {
        for (field, dir) in [("home_dir", &self.home_dir), ("activation_dir", &self.activation_dir)] {
            script::validate_remote_path(dir).map_err(|reason| ConfigError::Invalid { field, reason })?;
        }
        if let Some(owner) = &self.activation_owner {
            validate_token("activation_owner", owner, &[':', '.', '-', '_'])?;
        }
        if self.max_concurrent_transfers == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_transfers",
                reason: "must be at least 1".to_string(),
            });
        }
        if local_only {
            return Ok(());
        }

        let host = self.host.as_deref().ok_or(ConfigError::Missing("host"))?;
        validate_token("host", host, &['.', '-', '_', ':', '[', ']'])?;
        validate_token("user", &self.user, &['.', '-', '_'])?;
        validate_token(
            "strict_host_key_checking",
            &self.strict_host_key_checking,
            &['-'],
        )?;
        if self.port == Some(0) {
            return Err(ConfigError::Invalid {
                field: "port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }

        let key_path = self.key_path.as_deref().ok_or(ConfigError::Missing("key_path"))?;
        check_private_key(&expand_home(key_path))
    }

    pub fn target(&self) -> Result<RemoteTarget, ConfigError> {
        let host = self.host.clone().ok_or(ConfigError::Missing("host"))?;
        let key_path = self
            .key_path
            .as_deref()
            .map(expand_home)
            .ok_or(ConfigError::Missing("key_path"))?;
        Ok(RemoteTarget {
            host,
            port: self.port,
            user: self.user.clone(),
            key_path,
        })
    }

    pub fn workspace(&self) -> RemoteWorkspace {
        RemoteWorkspace::new(self.home_dir.clone(), self.activation_dir.clone())
            .with_activation_owner(self.activation_owner.clone())
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            connect_timeout_secs: self.connect_timeout_secs,
            strict_host_key_checking: self.strict_host_key_checking.clone(),
        }
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            no_clobber: self.no_clobber,
            max_concurrent_transfers: self.max_concurrent_transfers,
            transfer_retries: self.transfer_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            verify_checksums: self.verify_checksums,
        }
    }

    /// Local programs a remote run shells out to.
    pub fn ensure_tools_available(&self) -> Result<(), ConfigError> {
        for tool in ["ssh", self.transfer_method.program()] {
            which::which(tool).map_err(|_| ConfigError::ToolMissing { tool })?;
        }
        Ok(())
    }
}

/// Resolve a leading `~/` against the local home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Reject empty values, leading dashes (option injection) and anything
/// outside alphanumerics plus `extra`.
fn validate_token(field: &'static str, value: &str, extra: &[char]) -> Result<(), ConfigError> {
    let reason = if value.is_empty() {
        Some("must not be empty".to_string())
    } else if value.starts_with('-') {
        Some(format!("must not start with '-': {value:?}"))
    } else if let Some(c) = value
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !extra.contains(c))
    {
        Some(format!("unexpected character {c:?} in {value:?}"))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ConfigError::Invalid { field, reason }),
        None => Ok(()),
    }
}

fn check_private_key(path: &Path) -> Result<(), ConfigError> {
    let unreadable = |source| ConfigError::KeyUnreadable {
        path: path.display().to_string(),
        source,
    };
    let metadata = std::fs::metadata(path).map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(ConfigError::Invalid {
            field: "key_path",
            reason: format!("{} is not a regular file", path.display()),
        });
    }
    std::fs::File::open(path).map_err(unreadable)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                "Private key {} has overly permissive permissions: {:o}",
                path.display(),
                mode & 0o777
            );
        }
    }

    Ok(())
}

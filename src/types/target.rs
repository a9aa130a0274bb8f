use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_SSH_USER: &str = "ec2-user";
pub const DEFAULT_SSH_PORT: u16 = 22;

/// The single remote host a run deploys to.
///
/// Built once from configuration and shared read-only by every executor
/// and transporter call of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTarget {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub key_path: PathBuf,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, user: impl Into<String>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: user.into(),
            key_path: key_path.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    /// `user@host` as understood by ssh, scp and rsync.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `user@host:path` for copy tools.
    pub fn remote_spec(&self, remote_path: &str) -> String {
        format!("{}:{}", self.destination(), remote_path)
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}@{}:{}", self.user, self.host, port),
            None => write!(f, "{}@{}", self.user, self.host),
        }
    }
}

use crate::remote::{script, RemoteExecutionError};
use crate::types::RemoteTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Runs one shell command on the target host and returns its combined
/// output. Implementations make no decisions about what to run.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, target: &RemoteTarget, command: &str)
        -> Result<String, RemoteExecutionError>;
}

/// Connection options shared by every ssh-based tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshOptions {
    pub connect_timeout_secs: u64,
    /// Value for `StrictHostKeyChecking` (`yes`, `accept-new`, `no`).
    pub strict_host_key_checking: String,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            strict_host_key_checking: "accept-new".to_string(),
        }
    }
}

impl SshOptions {
    /// Identity and `-o` options common to ssh, scp and rsync's `-e`.
    /// `port_flag` is `-p` for ssh and `-P` for scp.
    pub fn common_args(&self, target: &RemoteTarget, port_flag: &str) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            target.key_path.display().to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", self.strict_host_key_checking),
        ];
        if let Some(port) = target.port {
            args.push(port_flag.to_string());
            args.push(port.to_string());
        }
        args
    }
}

/// Remote executor backed by the system `ssh` client.
#[derive(Debug, Clone, Default)]
pub struct SshExecutor {
    options: SshOptions,
}

impl SshExecutor {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SshOptions {
        &self.options
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(
        &self,
        target: &RemoteTarget,
        command: &str,
    ) -> Result<String, RemoteExecutionError> {
        debug!("Executing on {}: {}", target, command);

        let mut cmd = Command::new("ssh");
        cmd.args(self.options.common_args(target, "-p"))
            .arg("--")
            .arg(target.destination())
            .arg(script::wrap_sh(command))
            .kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| {
            RemoteExecutionError::new(command, format!("failed to spawn ssh: {e}"), "")
        })?;
        check_output(command, output)
    }
}

/// Turn a finished child process into combined output or an error.
pub(crate) fn check_output(command: &str, output: Output) -> Result<String, RemoteExecutionError> {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        debug!("Command output: {}", combined.trim_end());
        Ok(combined)
    } else {
        let reason = match output.status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        Err(RemoteExecutionError::new(command, reason, combined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_args_without_port() {
        let target = RemoteTarget::new("host", "ec2-user", "/keys/id.pem");
        let args = SshOptions::default().common_args(&target, "-p");
        assert_eq!(
            args,
            vec![
                "-i",
                "/keys/id.pem",
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-o",
                "StrictHostKeyChecking=accept-new",
            ]
        );
    }

    #[test]
    fn test_common_args_port_flag() {
        let target = RemoteTarget::new("host", "ec2-user", "/k").with_port(2200);
        let scp_args = SshOptions::default().common_args(&target, "-P");
        assert_eq!(&scp_args[scp_args.len() - 2..], ["-P", "2200"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_check_output_combines_streams() {
        use std::os::unix::process::ExitStatusExt;

        let output = Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout: b"out\n".to_vec(),
            stderr: b"err\n".to_vec(),
        };
        assert_eq!(check_output("cmd", output).unwrap(), "out\nerr\n");

        let failed = Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: b"boom".to_vec(),
        };
        let err = check_output("cmd", failed).unwrap_err();
        assert_eq!(err.reason, "exit status 1");
        assert_eq!(err.output, "boom");
        assert_eq!(err.command, "cmd");
    }
}

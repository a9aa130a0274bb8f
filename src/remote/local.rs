//! Local stand-ins for the remote executor and transporter.
//!
//! They run the exact same scripts through `sh -c` on this machine and copy
//! files with `tokio::fs`, which is what `--localhost` deploys use.

use crate::remote::executor::check_output;
use crate::remote::transporter::{ensure_local_file, partial_name, remote_file_name};
use crate::remote::{
    ArtifactTransporter, RemoteExecutionError, RemoteExecutor, TransferError, TransferFailure,
    TransferReceipt,
};
use crate::types::{join_remote, RemoteTarget};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn execute(
        &self,
        _target: &RemoteTarget,
        command: &str,
    ) -> Result<String, RemoteExecutionError> {
        debug!("Executing locally: {}", command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RemoteExecutionError::new(command, format!("failed to spawn sh: {e}"), ""))?;
        check_output(command, output)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalTransporter;

impl LocalTransporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactTransporter for LocalTransporter {
    async fn transfer(
        &self,
        _target: &RemoteTarget,
        local_path: &Path,
        remote_dir: &str,
        no_clobber: bool,
    ) -> Result<TransferReceipt, TransferError> {
        let name = remote_file_name(local_path, remote_dir)?;
        ensure_local_file(local_path, remote_dir).await?;

        let final_path = PathBuf::from(join_remote(remote_dir, &name));
        let partial_path = PathBuf::from(join_remote(remote_dir, &partial_name(&name)));
        let transport_err = |e: std::io::Error| {
            TransferError::new(local_path, remote_dir, TransferFailure::Transport, e.to_string())
        };

        if no_clobber && tokio::fs::try_exists(&final_path).await.map_err(transport_err)? {
            return Ok(TransferReceipt::skipped());
        }

        let bytes = tokio::fs::copy(local_path, &partial_path)
            .await
            .map_err(transport_err)?;
        tokio::fs::rename(&partial_path, &final_path)
            .await
            .map_err(transport_err)?;

        Ok(TransferReceipt::copied(format!(
            "copied {bytes} bytes to {}",
            final_path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target() -> RemoteTarget {
        RemoteTarget::new("localhost", "nobody", "/dev/null")
    }

    #[tokio::test]
    async fn test_local_executor_returns_output() {
        let output = LocalExecutor::new()
            .execute(&target(), "echo hello; echo oops >&2")
            .await
            .unwrap();
        assert_eq!(output, "hello\noops\n");
    }

    #[tokio::test]
    async fn test_local_executor_reports_failure_with_output() {
        let err = LocalExecutor::new()
            .execute(&target(), "echo partial; exit 3")
            .await
            .unwrap_err();
        assert_eq!(err.reason, "exit status 3");
        assert_eq!(err.output, "partial\n");
    }

    #[tokio::test]
    async fn test_local_transfer_and_no_clobber() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("tool");
        std::fs::write(&src, b"new").unwrap();
        let dest = dest_dir.path().to_str().unwrap();

        let receipt = LocalTransporter::new()
            .transfer(&target(), &src, dest, false)
            .await
            .unwrap();
        assert!(matches!(receipt, TransferReceipt::Copied { .. }));
        assert_eq!(std::fs::read(dest_dir.path().join("tool")).unwrap(), b"new");
        assert!(!dest_dir.path().join(".tool.partial").exists());

        std::fs::write(&src, b"newer").unwrap();
        let receipt = LocalTransporter::new()
            .transfer(&target(), &src, dest, true)
            .await
            .unwrap();
        assert_eq!(receipt, TransferReceipt::skipped());
        assert_eq!(std::fs::read(dest_dir.path().join("tool")).unwrap(), b"new");
    }
}

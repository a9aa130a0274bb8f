use std::path::PathBuf;
use thiserror::Error;

/// A remote command that could not be run or exited non-zero.
#[derive(Debug, Error)]
#[error("remote command failed: {reason}{}", format_output(.output))]
pub struct RemoteExecutionError {
    pub command: String,
    pub reason: String,
    /// Combined stdout/stderr captured before the failure.
    pub output: String,
}

impl RemoteExecutionError {
    pub fn new(command: impl Into<String>, reason: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reason: reason.into(),
            output: output.into(),
        }
    }
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\noutput: {trimmed}")
    }
}

/// Which side of a transfer broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFailure {
    /// The local artifact is missing or unreadable. Retrying will not help.
    LocalFile,
    /// The copy tool or the remote side failed.
    Transport,
    /// The landed file does not match the local one.
    Integrity,
}

#[derive(Debug, Error)]
#[error("transfer of {} to {remote_dir} failed: {reason}", .local_path.display())]
pub struct TransferError {
    pub local_path: PathBuf,
    pub remote_dir: String,
    pub kind: TransferFailure,
    pub reason: String,
}

impl TransferError {
    pub fn new(
        local_path: impl Into<PathBuf>,
        remote_dir: impl Into<String>,
        kind: TransferFailure,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            remote_dir: remote_dir.into(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == TransferFailure::Transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_includes_output() {
        let err = RemoteExecutionError::new("mkdir -p /x", "exit status 1", "permission denied\n");
        assert_eq!(
            err.to_string(),
            "remote command failed: exit status 1\noutput: permission denied"
        );

        let quiet = RemoteExecutionError::new("true", "connection refused", "  ");
        assert_eq!(quiet.to_string(), "remote command failed: connection refused");
    }

    #[test]
    fn test_only_transport_failures_retry() {
        let err = TransferError::new("/dl/a", "/home/u/bin", TransferFailure::LocalFile, "missing");
        assert!(!err.is_retryable());
        let err = TransferError::new("/dl/a", "/home/u/bin", TransferFailure::Transport, "timeout");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "transfer of /dl/a to /home/u/bin failed: timeout");
    }
}

use crate::remote::executor::{check_output, SshExecutor, SshOptions};
use crate::remote::{script, RemoteExecutor, TransferError, TransferFailure};
use crate::types::{join_remote, RemoteTarget};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tokio::process::Command;
use tracing::debug;

/// A helper command a transporter ran on the target around the copy itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStep {
    pub command: String,
    pub output: String,
}

/// How a transfer ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferReceipt {
    Copied { output: String, steps: Vec<RemoteStep> },
    /// No-clobber mode and the remote file already existed.
    SkippedExisting { steps: Vec<RemoteStep> },
}

impl TransferReceipt {
    pub fn copied(output: impl Into<String>) -> Self {
        TransferReceipt::Copied {
            output: output.into(),
            steps: Vec::new(),
        }
    }

    pub fn skipped() -> Self {
        TransferReceipt::SkippedExisting { steps: Vec::new() }
    }

    /// Remote commands run on the way, in the order they ran.
    pub fn steps(&self) -> &[RemoteStep] {
        match self {
            TransferReceipt::Copied { steps, .. } | TransferReceipt::SkippedExisting { steps } => steps,
        }
    }
}

/// Copies a local file to `remote_dir/<basename>` on the target.
#[async_trait]
pub trait ArtifactTransporter: Send + Sync {
    async fn transfer(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        remote_dir: &str,
        no_clobber: bool,
    ) -> Result<TransferReceipt, TransferError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMethod {
    #[default]
    Scp,
    Rsync,
}

impl FromStr for TransferMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scp" => Ok(TransferMethod::Scp),
            "rsync" => Ok(TransferMethod::Rsync),
            _ => Err(format!("Unsupported transfer method: {s}")),
        }
    }
}

impl TransferMethod {
    pub fn program(&self) -> &'static str {
        match self {
            TransferMethod::Scp => "scp",
            TransferMethod::Rsync => "rsync",
        }
    }
}

/// Build the transporter for a method over the given ssh options.
pub fn transporter_for(method: TransferMethod, options: SshOptions) -> Box<dyn ArtifactTransporter> {
    match method {
        TransferMethod::Scp => Box::new(ScpTransporter::new(options)),
        TransferMethod::Rsync => Box::new(RsyncTransporter::new(options)),
    }
}

/// Base name of the local file, validated for use as a remote path component.
pub(crate) fn remote_file_name(local_path: &Path, remote_dir: &str) -> Result<String, TransferError> {
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    script::validate_file_name(&name)
        .map_err(|reason| TransferError::new(local_path, remote_dir, TransferFailure::LocalFile, reason))?;
    Ok(name)
}

pub(crate) async fn ensure_local_file(local_path: &Path, remote_dir: &str) -> Result<(), TransferError> {
    let metadata = tokio::fs::metadata(local_path).await.map_err(|e| {
        TransferError::new(local_path, remote_dir, TransferFailure::LocalFile, e.to_string())
    })?;
    if !metadata.is_file() {
        return Err(TransferError::new(
            local_path,
            remote_dir,
            TransferFailure::LocalFile,
            "not a regular file",
        ));
    }
    Ok(())
}

/// Hidden name an upload is written to before it is renamed into place.
pub fn partial_name(file_name: &str) -> String {
    format!(".{file_name}.partial")
}

/// `scp` into a hidden partial file, then rename over ssh. The rename is
/// what makes the file visible to the install phase, so an interrupted copy
/// never shows up under the artifact's name.
#[derive(Debug, Clone)]
pub struct ScpTransporter<E = SshExecutor> {
    options: SshOptions,
    executor: E,
    program: &'static str,
}

impl ScpTransporter {
    pub fn new(options: SshOptions) -> Self {
        Self {
            executor: SshExecutor::new(options.clone()),
            options,
            program: "scp",
        }
    }
}

impl<E: RemoteExecutor> ScpTransporter<E> {
    /// Run the probe and rename through `executor` and copy with `program`,
    /// which must accept scp's arguments.
    pub fn with_executor(options: SshOptions, executor: E, program: &'static str) -> Self {
        Self {
            options,
            executor,
            program,
        }
    }

    async fn run_step(
        &self,
        target: &RemoteTarget,
        command: String,
        steps: &mut Vec<RemoteStep>,
    ) -> Result<String, String> {
        match self.executor.execute(target, &command).await {
            Ok(output) => {
                steps.push(RemoteStep {
                    command,
                    output: output.clone(),
                });
                Ok(output)
            }
            Err(e) => Err(format!("{e}\ncommand: {}", e.command)),
        }
    }
}

#[async_trait]
impl<E: RemoteExecutor> ArtifactTransporter for ScpTransporter<E> {
    async fn transfer(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        remote_dir: &str,
        no_clobber: bool,
    ) -> Result<TransferReceipt, TransferError> {
        let name = remote_file_name(local_path, remote_dir)?;
        ensure_local_file(local_path, remote_dir).await?;

        let final_path = join_remote(remote_dir, &name);
        let partial_path = join_remote(remote_dir, &partial_name(&name));
        let transport_err =
            |reason: String| TransferError::new(local_path, remote_dir, TransferFailure::Transport, reason);
        let mut steps = Vec::new();

        if no_clobber {
            let probe = self
                .run_step(target, script::probe_exists(&final_path), &mut steps)
                .await
                .map_err(transport_err)?;
            if script::is_present(&probe) {
                debug!("{} already present on {}, skipping", final_path, target);
                return Ok(TransferReceipt::SkippedExisting { steps });
            }
        }

        let mut cmd = Command::new(self.program);
        cmd.arg("-p")
            .arg("-q")
            .args(self.options.common_args(target, "-P"))
            .arg("--")
            .arg(local_path)
            .arg(target.remote_spec(&partial_path))
            .kill_on_drop(true);
        debug!("Copying {} to {}", local_path.display(), target.remote_spec(&partial_path));

        let output = cmd
            .output()
            .await
            .map_err(|e| transport_err(format!("failed to spawn {}: {e}", self.program)))?;
        let copied = check_output(self.program, output).map_err(|e| transport_err(e.to_string()))?;

        let finalize = script::finalize_upload(&partial_path, &final_path, no_clobber);
        let moved = self
            .run_step(target, finalize, &mut steps)
            .await
            .map_err(transport_err)?;
        if script::was_skipped(&moved) {
            return Ok(TransferReceipt::SkippedExisting { steps });
        }
        Ok(TransferReceipt::Copied {
            output: copied,
            steps,
        })
    }
}

/// `rsync` over ssh. rsync already writes to a temporary name and renames on
/// completion; `--ignore-existing` provides no-clobber.
#[derive(Debug, Clone, Default)]
pub struct RsyncTransporter {
    options: SshOptions,
}

impl RsyncTransporter {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    fn remote_shell(&self, target: &RemoteTarget) -> String {
        let mut words = vec!["ssh".to_string()];
        words.extend(self.options.common_args(target, "-p"));
        shell_words::join(words)
    }
}

#[async_trait]
impl ArtifactTransporter for RsyncTransporter {
    async fn transfer(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        remote_dir: &str,
        no_clobber: bool,
    ) -> Result<TransferReceipt, TransferError> {
        let name = remote_file_name(local_path, remote_dir)?;
        ensure_local_file(local_path, remote_dir).await?;
        let final_path = join_remote(remote_dir, &name);

        let mut cmd = Command::new("rsync");
        cmd.arg("--perms")
            .arg("--times")
            .arg("--itemize-changes")
            .arg("-e")
            .arg(self.remote_shell(target));
        if no_clobber {
            cmd.arg("--ignore-existing");
        }
        cmd.arg("--")
            .arg(local_path)
            .arg(target.remote_spec(&final_path))
            .kill_on_drop(true);
        debug!("Syncing {} to {}", local_path.display(), target.remote_spec(&final_path));

        let output = cmd.output().await.map_err(|e| {
            TransferError::new(
                local_path,
                remote_dir,
                TransferFailure::Transport,
                format!("failed to spawn rsync: {e}"),
            )
        })?;
        let itemized = check_output("rsync", output).map_err(|e| {
            TransferError::new(local_path, remote_dir, TransferFailure::Transport, e.to_string())
        })?;

        if no_clobber && itemized.trim().is_empty() {
            return Ok(TransferReceipt::skipped());
        }
        Ok(TransferReceipt::copied(itemized))
    }
}

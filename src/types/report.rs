use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    WorkspacePrepared,
    Transferring,
    Installing,
    Complete,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::WorkspacePrepared => "workspace-prepared",
            RunPhase::Transferring => "transferring",
            RunPhase::Installing => "installing",
            RunPhase::Complete => "complete",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Transferred { checksum: Option<String> },
    /// No-clobber mode found the file already present.
    Skipped,
    Failed { error: String },
    Cancelled,
}

impl TransferOutcome {
    /// Whether the landed file can be installed.
    pub fn is_landed(&self) -> bool {
        matches!(self, TransferOutcome::Transferred { .. } | TransferOutcome::Skipped)
    }
}

/// Per-artifact result of the install phase. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    /// Binary names copied into the activation directory.
    pub installed: Vec<String>,
    /// Binary names whose previous version was moved into the backup store.
    pub backed_up: Vec<String>,
}

impl InstallRecord {
    /// Parse the marker lines emitted by the install script.
    pub fn from_script_output(output: &str) -> Self {
        let mut record = Self::default();
        for line in output.lines() {
            if let Some(name) = line.strip_prefix(crate::remote::script::BACKUP_MARKER) {
                record.backed_up.push(name.trim().to_string());
            } else if let Some(name) = line.strip_prefix(crate::remote::script::INSTALL_MARKER) {
                record.installed.push(name.trim().to_string());
            }
        }
        record
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallOutcome {
    Installed(InstallRecord),
    Failed { error: String },
    /// Not attempted because the artifact never landed.
    NotAttempted,
    Cancelled,
}

/// Everything that happened to one artifact during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub artifact: String,
    pub transfer: TransferOutcome,
    pub install: InstallOutcome,
}

impl ArtifactReport {
    pub fn new(artifact: impl Into<String>, transfer: TransferOutcome) -> Self {
        Self {
            artifact: artifact.into(),
            transfer,
            install: InstallOutcome::NotAttempted,
        }
    }

    /// The first failure recorded for this artifact, if any.
    pub fn failure(&self) -> Option<String> {
        if let TransferOutcome::Failed { error } = &self.transfer {
            return Some(format!("transfer failed: {error}"));
        }
        if let InstallOutcome::Failed { error } = &self.install {
            return Some(format!("install failed: {error}"));
        }
        None
    }
}

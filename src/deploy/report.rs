use crate::deploy::transcript::TranscriptEntry;
use crate::types::{ArtifactReport, InstallOutcome, RunPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one deployment run: per-artifact results plus the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub target: String,
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactReport>,
    pub transcript: Vec<TranscriptEntry>,
}

impl RunReport {
    /// `(artifact, error)` for every artifact that failed to transfer or install.
    pub fn failures(&self) -> Vec<(&str, String)> {
        self.artifacts
            .iter()
            .filter_map(|a| a.failure().map(|e| (a.artifact.as_str(), e)))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.phase == RunPhase::Complete && self.failures().is_empty()
    }

    /// Binary names activated during the run, in install order.
    pub fn installed_binaries(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .filter_map(|a| match &a.install {
                InstallOutcome::Installed(record) => Some(record),
                _ => None,
            })
            .flat_map(|record| record.installed.iter().map(String::as_str))
            .collect()
    }

    pub fn cancelled(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.install, InstallOutcome::Cancelled))
            .count()
    }
}

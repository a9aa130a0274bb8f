use crate::deploy::integrity::{digests_match, sha256_file};
use crate::deploy::preflight::{self, ArtifactPlan, DeploymentPlan};
use crate::deploy::report::RunReport;
use crate::deploy::transcript::{Transcript, TranscriptAction};
use crate::deploy::{DeployError, InstallError, Result};
use crate::remote::{
    script, ArtifactTransporter, RemoteExecutionError, RemoteExecutor, TransferError,
    TransferFailure, TransferReceipt,
};
use crate::types::*;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const MAX_BACKOFF_EXPONENT: u32 = 10;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub no_clobber: bool,
    /// Upper bound on transfers in flight; `None` runs them all at once.
    pub max_concurrent_transfers: Option<usize>,
    /// Extra attempts for transport failures. Local file errors never retry.
    pub transfer_retries: u32,
    pub retry_backoff: Duration,
    pub verify_checksums: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            no_clobber: false,
            max_concurrent_transfers: None,
            transfer_retries: 0,
            retry_backoff: Duration::from_millis(500),
            verify_checksums: true,
        }
    }
}

/// Drives one deployment run against a single remote host:
/// prepare the workspace, transfer every artifact concurrently, then install
/// the landed artifacts one at a time in input order.
pub struct DeploymentOrchestrator {
    target: RemoteTarget,
    workspace: RemoteWorkspace,
    executor: Arc<dyn RemoteExecutor>,
    transporter: Arc<dyn ArtifactTransporter>,
    options: OrchestratorOptions,
    cancel: CancellationToken,
    transcript: Transcript,
    phase: RunPhase,
}

impl DeploymentOrchestrator {
    pub fn new(
        target: RemoteTarget,
        workspace: RemoteWorkspace,
        executor: Arc<dyn RemoteExecutor>,
        transporter: Arc<dyn ArtifactTransporter>,
    ) -> Self {
        Self {
            target,
            workspace,
            executor,
            transporter,
            options: OrchestratorOptions::default(),
            cancel: CancellationToken::new(),
            transcript: Transcript::new(),
            phase: RunPhase::Idle,
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Once the token is cancelled, transfers that have not started are
    /// skipped, in-flight transfers finish, and no further installs start.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    pub fn workspace(&self) -> &RemoteWorkspace {
        &self.workspace
    }

    fn transition(&mut self, next: RunPhase) {
        debug!("Run phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Full run. Errors only when pre-flight validation or workspace
    /// preparation fails; per-artifact failures are in the report.
    pub async fn run(&mut self, artifacts: &[ArtifactRef]) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        self.transcript = Transcript::new();
        self.phase = RunPhase::Idle;

        info!(
            "Deploying {} artifacts to {} (run {})",
            artifacts.len(),
            self.target,
            run_id
        );

        let owned = artifacts.to_vec();
        let plan = tokio::task::spawn_blocking(move || preflight::plan(&owned)).await??;

        if let Err(e) = self.prepare_workspace().await {
            error!("{}", e);
            self.transition(RunPhase::Failed);
            return Err(e);
        }

        let transfers = self.transfer_all(&plan).await;
        let artifacts = self.install_all(&plan, transfers).await;
        self.transition(RunPhase::Complete);

        let report = RunReport {
            run_id,
            target: self.target.to_string(),
            phase: self.phase,
            started_at,
            completed_at: Utc::now(),
            artifacts,
            transcript: self.transcript.entries().await,
        };

        let failures = report.failures();
        if failures.is_empty() {
            info!("Successfully deployed and installed binaries");
        } else {
            warn!(
                "Deployment finished with {} of {} artifacts failing",
                failures.len(),
                report.artifacts.len()
            );
        }
        Ok(report)
    }

    /// Create the landing, backup and activation directories. Idempotent.
    pub async fn prepare_workspace(&mut self) -> Result<()> {
        for dir in [&self.workspace.home_dir, &self.workspace.activation_dir] {
            script::validate_remote_path(dir).map_err(DeployError::Configuration)?;
        }

        info!("Preparing remote workspace under {}", self.workspace.home_dir);
        let command = script::prepare_workspace(&self.workspace);
        let result = self.executor.execute(&self.target, &command).await;
        record_execute(&self.transcript, None, &command, &result).await;

        result.map_err(|source| DeployError::Prepare {
            host: self.target.host.clone(),
            source,
        })?;
        self.transition(RunPhase::WorkspacePrepared);
        Ok(())
    }

    /// Transfer every artifact concurrently and wait for all of them. A
    /// failing transfer never cancels its siblings.
    pub async fn transfer_all(&mut self, plan: &DeploymentPlan) -> HashMap<String, TransferOutcome> {
        self.transition(RunPhase::Transferring);

        let ctx = Arc::new(TransferContext {
            target: self.target.clone(),
            landing_dir: self.workspace.landing_dir(),
            executor: self.executor.clone(),
            transporter: self.transporter.clone(),
            options: self.options.clone(),
            transcript: self.transcript.clone(),
            cancel: self.cancel.clone(),
        });
        let semaphore = self
            .options
            .max_concurrent_transfers
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let outcomes = Arc::new(Mutex::new(HashMap::new()));

        let mut tasks = JoinSet::new();
        for item in &plan.artifacts {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            let outcomes = outcomes.clone();
            let item = item.clone();
            let span = info_span!("artifact", name = %item.file_name);

            tasks.spawn(
                async move {
                    let _permit = match semaphore {
                        Some(semaphore) => tokio::select! {
                            permit = semaphore.acquire_owned() => permit.ok(),
                            _ = ctx.cancel.cancelled() => None,
                        },
                        None => None,
                    };
                    let outcome = if ctx.cancel.is_cancelled() {
                        info!("Cancelled before transfer started");
                        TransferOutcome::Cancelled
                    } else {
                        ctx.transfer(&item).await
                    };
                    outcomes.lock().await.insert(item.file_name.clone(), outcome);
                }
                .instrument(span),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Transfer task aborted: {}", e);
            }
        }

        let mut outcomes = std::mem::take(&mut *outcomes.lock().await);
        for item in &plan.artifacts {
            outcomes
                .entry(item.file_name.clone())
                .or_insert_with(|| TransferOutcome::Failed {
                    error: "transfer task aborted".to_string(),
                });
        }
        outcomes
    }

    /// Install landed artifacts serially, in plan order.
    pub async fn install_all(
        &mut self,
        plan: &DeploymentPlan,
        mut transfers: HashMap<String, TransferOutcome>,
    ) -> Vec<ArtifactReport> {
        self.transition(RunPhase::Installing);

        let mut reports = Vec::with_capacity(plan.len());
        for item in &plan.artifacts {
            let transfer = transfers
                .remove(&item.file_name)
                .unwrap_or_else(|| TransferOutcome::Failed {
                    error: "no transfer recorded".to_string(),
                });
            let mut report = ArtifactReport::new(item.file_name.clone(), transfer);

            if report.transfer == TransferOutcome::Cancelled {
                report.install = InstallOutcome::Cancelled;
            } else if !report.transfer.is_landed() {
                debug!("Not installing {}: transfer did not land", item.file_name);
            } else if self.cancel.is_cancelled() {
                info!("Cancelled before installing {}", item.file_name);
                report.install = InstallOutcome::Cancelled;
            } else {
                let span = info_span!("artifact", name = %item.file_name);
                report.install = match self.install_one(item).instrument(span).await {
                    Ok(record) => InstallOutcome::Installed(record),
                    Err(e) => {
                        error!("{}", e);
                        InstallOutcome::Failed {
                            error: e.source.to_string(),
                        }
                    }
                };
            }
            reports.push(report);
        }
        reports
    }

    async fn install_one(&self, item: &ArtifactPlan) -> std::result::Result<InstallRecord, InstallError> {
        info!("Installing binaries from {}", item.file_name);
        let command = script::install_artifact(&self.workspace, &item.file_name, &item.stem, item.kind);
        let result = self.executor.execute(&self.target, &command).await;
        record_execute(&self.transcript, Some(&item.file_name), &command, &result).await;

        let output = result.map_err(|source| InstallError {
            artifact: item.file_name.clone(),
            source,
        })?;
        let record = InstallRecord::from_script_output(&output);
        if record.installed.is_empty() {
            info!("No executables found in {}", item.file_name);
        } else {
            info!(
                "Installed {:?} into {} (backed up {:?})",
                record.installed, self.workspace.activation_dir, record.backed_up
            );
        }
        Ok(record)
    }
}

/// Exponential backoff for the given zero-based attempt, capped.
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.pow(attempt.min(MAX_BACKOFF_EXPONENT)))
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}

async fn record_execute(
    transcript: &Transcript,
    artifact: Option<&str>,
    command: &str,
    result: &std::result::Result<String, RemoteExecutionError>,
) {
    let outcome = result.as_deref().map_err(|e| e.to_string());
    transcript
        .record(artifact, TranscriptAction::Execute, command, outcome)
        .await;
}

/// Everything a transfer task needs, shared across tasks.
struct TransferContext {
    target: RemoteTarget,
    landing_dir: String,
    executor: Arc<dyn RemoteExecutor>,
    transporter: Arc<dyn ArtifactTransporter>,
    options: OrchestratorOptions,
    transcript: Transcript,
    cancel: CancellationToken,
}

impl TransferContext {
    async fn transfer(&self, item: &ArtifactPlan) -> TransferOutcome {
        let local = item.artifact.path();
        let detail = format!(
            "{} -> {}",
            local.display(),
            self.target.remote_spec(&self.landing_dir)
        );
        let mut attempt = 0;

        let receipt = loop {
            debug!("Transferring {}", detail);
            let result = self
                .transporter
                .transfer(&self.target, local, &self.landing_dir, self.options.no_clobber)
                .await;

            match result {
                Ok(receipt) => {
                    let note = match &receipt {
                        TransferReceipt::Copied { output, .. } => output.as_str(),
                        TransferReceipt::SkippedExisting { .. } => "skipped: already present",
                    };
                    self.transcript
                        .record(Some(&item.file_name), TranscriptAction::Transfer, &detail, Ok(note))
                        .await;
                    for step in receipt.steps() {
                        self.transcript
                            .record(
                                Some(&item.file_name),
                                TranscriptAction::Execute,
                                &step.command,
                                Ok(&step.output),
                            )
                            .await;
                    }
                    break receipt;
                }
                Err(e) => {
                    self.transcript
                        .record(
                            Some(&item.file_name),
                            TranscriptAction::Transfer,
                            &detail,
                            Err(e.to_string()),
                        )
                        .await;
                    if e.is_retryable() && attempt < self.options.transfer_retries {
                        let delay = retry_delay(self.options.retry_backoff, attempt);
                        attempt += 1;
                        warn!("Transfer attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    warn!("{}", e);
                    return TransferOutcome::Failed {
                        error: e.to_string(),
                    };
                }
            }
        };

        match receipt {
            TransferReceipt::SkippedExisting { .. } => {
                info!("{} already present remotely, not overwritten", item.file_name);
                TransferOutcome::Skipped
            }
            TransferReceipt::Copied { .. } if !self.options.verify_checksums => {
                info!("Transferred {}", item.file_name);
                TransferOutcome::Transferred { checksum: None }
            }
            TransferReceipt::Copied { .. } => match self.verify(item).await {
                Ok(checksum) => {
                    info!("Transferred {} (sha256 {})", item.file_name, checksum);
                    TransferOutcome::Transferred {
                        checksum: Some(checksum),
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    TransferOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            },
        }
    }

    /// Compare the landed file with the local one; a mismatch removes the
    /// landed file so it can never be installed.
    async fn verify(&self, item: &ArtifactPlan) -> std::result::Result<String, TransferError> {
        let local = item.artifact.path();
        let fail = |kind: TransferFailure, reason: String| {
            TransferError::new(local, self.landing_dir.as_str(), kind, reason)
        };

        let expected = sha256_file(local)
            .await
            .map_err(|e| fail(TransferFailure::LocalFile, e.to_string()))?;

        let remote_path = join_remote(&self.landing_dir, &item.file_name);
        let command = script::sha256(&remote_path);
        let result = self.executor.execute(&self.target, &command).await;
        record_execute(&self.transcript, Some(&item.file_name), &command, &result).await;
        let output = result.map_err(|e| fail(TransferFailure::Transport, e.to_string()))?;

        if !digests_match(&expected, &output) {
            let cleanup = script::remove_file(&remote_path);
            let removed = self.executor.execute(&self.target, &cleanup).await;
            record_execute(&self.transcript, Some(&item.file_name), &cleanup, &removed).await;
            if let Err(e) = removed {
                warn!("Could not remove corrupt upload {}: {}", remote_path, e);
            }
            return Err(fail(
                TransferFailure::Integrity,
                format!(
                    "checksum mismatch: local {expected}, remote {}",
                    output.trim()
                ),
            ));
        }

        debug!("Checksum verified for {}", item.file_name);
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{LocalExecutor, LocalTransporter, RemoteStep};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        downloads: std::path::PathBuf,
        workspace: RemoteWorkspace,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let downloads = root.path().join("downloads");
            std::fs::create_dir_all(&downloads).unwrap();
            let workspace = RemoteWorkspace::new(
                root.path().join("home").to_str().unwrap(),
                root.path().join("activation").to_str().unwrap(),
            )
            .with_activation_owner(None);
            Self {
                _root: root,
                downloads,
                workspace,
            }
        }

        fn executable(&self, name: &str, body: &str) -> ArtifactRef {
            let path = self.downloads.join(name);
            std::fs::write(&path, body).unwrap();
            ArtifactRef::new(path)
        }

        fn orchestrator(&self, transporter: Arc<dyn ArtifactTransporter>) -> DeploymentOrchestrator {
            DeploymentOrchestrator::new(
                RemoteTarget::new("localhost", "nobody", "/dev/null"),
                self.workspace.clone(),
                Arc::new(LocalExecutor::new()),
                transporter,
            )
        }
    }

    fn workspace_modes(ws: &RemoteWorkspace) -> [u32; 3] {
        use std::os::unix::fs::PermissionsExt;
        [ws.home_dir.clone(), ws.landing_dir(), ws.backup_dir()].map(|dir| {
            std::fs::metadata(dir).unwrap().permissions().mode() & 0o777
        })
    }

    /// Fails transport for the first `failures` calls, then copies locally.
    struct FlakyTransporter {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactTransporter for FlakyTransporter {
        async fn transfer(
            &self,
            target: &RemoteTarget,
            local_path: &Path,
            remote_dir: &str,
            no_clobber: bool,
        ) -> std::result::Result<TransferReceipt, TransferError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(TransferError::new(
                    local_path,
                    remote_dir,
                    TransferFailure::Transport,
                    "connection reset",
                ));
            }
            LocalTransporter::new()
                .transfer(target, local_path, remote_dir, no_clobber)
                .await
        }
    }

    /// Copies the file, then corrupts what landed.
    struct CorruptingTransporter;

    #[async_trait]
    impl ArtifactTransporter for CorruptingTransporter {
        async fn transfer(
            &self,
            target: &RemoteTarget,
            local_path: &Path,
            remote_dir: &str,
            no_clobber: bool,
        ) -> std::result::Result<TransferReceipt, TransferError> {
            let receipt = LocalTransporter::new()
                .transfer(target, local_path, remote_dir, no_clobber)
                .await?;
            let landed = Path::new(remote_dir).join(local_path.file_name().unwrap());
            std::fs::write(landed, b"truncated").unwrap();
            Ok(receipt)
        }
    }

    /// Copies locally and reports the helper commands a real transporter runs.
    struct SteppingTransporter;

    #[async_trait]
    impl ArtifactTransporter for SteppingTransporter {
        async fn transfer(
            &self,
            target: &RemoteTarget,
            local_path: &Path,
            remote_dir: &str,
            no_clobber: bool,
        ) -> std::result::Result<TransferReceipt, TransferError> {
            LocalTransporter::new()
                .transfer(target, local_path, remote_dir, no_clobber)
                .await?;
            let step = |command: &str| RemoteStep {
                command: command.to_string(),
                output: String::new(),
            };
            Ok(TransferReceipt::Copied {
                output: String::new(),
                steps: vec![step("probe"), step("finalize")],
            })
        }
    }

    #[test]
    fn test_retry_delay_doubles_and_saturates() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(base, 0), Duration::from_millis(100));
        assert_eq!(retry_delay(base, 3), Duration::from_millis(800));
        assert_eq!(retry_delay(base, 40), Duration::from_millis(102_400));
        assert_eq!(retry_delay(Duration::from_secs(1), 9), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::MAX, 5), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_prepare_workspace_is_idempotent() {
        let fixture = Fixture::new();
        let mut orchestrator = fixture.orchestrator(Arc::new(LocalTransporter::new()));

        orchestrator.prepare_workspace().await.unwrap();
        let modes = workspace_modes(&fixture.workspace);
        orchestrator.prepare_workspace().await.unwrap();
        assert_eq!(orchestrator.phase(), RunPhase::WorkspacePrepared);
        assert_eq!(modes, [0o700, 0o700, 0o700]);
        assert_eq!(workspace_modes(&fixture.workspace), modes);

        assert!(Path::new(&fixture.workspace.landing_dir()).is_dir());
        assert!(Path::new(&fixture.workspace.backup_dir()).is_dir());
        assert!(Path::new(&fixture.workspace.activation_dir).is_dir());
    }

    #[tokio::test]
    async fn test_relative_workspace_is_rejected_before_remote_work() {
        let fixture = Fixture::new();
        let mut orchestrator = DeploymentOrchestrator::new(
            RemoteTarget::new("localhost", "nobody", "/dev/null"),
            RemoteWorkspace::new("relative/home", "/usr/local/bin"),
            Arc::new(LocalExecutor::new()),
            Arc::new(LocalTransporter::new()),
        );
        let artifact = fixture.executable("tool", "#!/bin/sh\n");

        let err = orchestrator.run(&[artifact]).await.unwrap_err();
        assert!(matches!(err, DeployError::Configuration(_)));
        assert_eq!(orchestrator.phase(), RunPhase::Failed);
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let fixture = Fixture::new();
        let transporter = Arc::new(FlakyTransporter {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let mut orchestrator = fixture
            .orchestrator(transporter.clone())
            .with_options(OrchestratorOptions {
                transfer_retries: 2,
                retry_backoff: Duration::from_millis(1),
                ..Default::default()
            });
        let artifact = fixture.executable("tool", "#!/bin/sh\necho new\n");

        let report = orchestrator.run(&[artifact]).await.unwrap();
        assert!(report.is_success(), "{:?}", report.failures());
        assert_eq!(transporter.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.installed_binaries(), vec!["tool"]);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let fixture = Fixture::new();
        let transporter = Arc::new(FlakyTransporter {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        });
        let mut orchestrator = fixture
            .orchestrator(transporter.clone())
            .with_options(OrchestratorOptions {
                transfer_retries: 1,
                retry_backoff: Duration::from_millis(1),
                ..Default::default()
            });
        let artifact = fixture.executable("tool", "x");

        let report = orchestrator.run(&[artifact]).await.unwrap();
        assert_eq!(transporter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.artifacts[0].install, InstallOutcome::NotAttempted);
    }

    #[tokio::test]
    async fn test_corrupt_upload_is_a_transfer_failure() {
        let fixture = Fixture::new();
        let mut orchestrator = fixture.orchestrator(Arc::new(CorruptingTransporter));
        let artifact = fixture.executable("tool", "#!/bin/sh\necho real\n");

        let report = orchestrator.run(&[artifact]).await.unwrap();
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("checksum mismatch"), "{}", failures[0].1);
        assert!(!Path::new(&fixture.workspace.landed_path("tool")).exists());
        assert!(!Path::new(&fixture.workspace.activation_dir).join("tool").exists());
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_transfers_and_installs() {
        let fixture = Fixture::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut orchestrator = fixture
            .orchestrator(Arc::new(LocalTransporter::new()))
            .with_cancellation(cancel);
        let artifact = fixture.executable("tool", "x");

        let report = orchestrator.run(&[artifact]).await.unwrap();
        assert_eq!(report.artifacts[0].transfer, TransferOutcome::Cancelled);
        assert_eq!(report.cancelled(), 1);
        assert!(report.failures().is_empty());
        assert!(!Path::new(&fixture.workspace.activation_dir).join("tool").exists());
    }

    #[tokio::test]
    async fn test_transcript_records_every_remote_action() {
        let fixture = Fixture::new();
        let mut orchestrator = fixture
            .orchestrator(Arc::new(LocalTransporter::new()))
            .with_options(OrchestratorOptions {
                verify_checksums: false,
                ..Default::default()
            });
        let artifact = fixture.executable("tool", "x");

        let report = orchestrator.run(&[artifact]).await.unwrap();
        let actions: Vec<_> = report.transcript.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                TranscriptAction::Execute,
                TranscriptAction::Transfer,
                TranscriptAction::Execute,
            ]
        );
        assert!(report.transcript.iter().all(|e| e.success));
    }

    #[tokio::test]
    async fn test_transcript_includes_transporter_steps() {
        let fixture = Fixture::new();
        let mut orchestrator = fixture
            .orchestrator(Arc::new(SteppingTransporter))
            .with_options(OrchestratorOptions {
                verify_checksums: false,
                ..Default::default()
            });
        let artifact = fixture.executable("tool", "x");

        let report = orchestrator.run(&[artifact]).await.unwrap();
        let entries: Vec<_> = report
            .transcript
            .iter()
            .map(|e| (e.action, e.detail.as_str()))
            .collect();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[1].0, TranscriptAction::Transfer);
        assert_eq!(entries[2], (TranscriptAction::Execute, "probe"));
        assert_eq!(entries[3], (TranscriptAction::Execute, "finalize"));
        assert_eq!(report.transcript[2].artifact.as_deref(), Some("tool"));
    }
}

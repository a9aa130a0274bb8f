use crate::deploy::{DeploymentPlan, RunReport, TranscriptEntry};
use crate::remote::script;
use crate::types::{InstallOutcome, RemoteTarget, RemoteWorkspace, TransferOutcome};

/// Print what a run would do: the pre-flight plan and every script it
/// would send to the host.
pub fn print_dry_run(target: &RemoteTarget, workspace: &RemoteWorkspace, plan: &DeploymentPlan) {
    println!("📋 Dry run against {target}");
    println!("  • Landing directory: {}", workspace.landing_dir());
    println!("  • Backup directory: {}", workspace.backup_dir());
    println!("  • Activation directory: {}", workspace.activation_dir);
    println!();

    println!("📦 Artifacts ({}):", plan.len());
    for artifact in &plan.artifacts {
        match &artifact.binaries {
            Some(binaries) if binaries.is_empty() => {
                println!("  ⚠️  {}: no executables found", artifact.file_name)
            }
            Some(binaries) => println!("  • {}: {}", artifact.file_name, binaries.join(", ")),
            None => println!("  ❌ {}: not readable locally", artifact.file_name),
        }
    }
    println!();

    println!("🔧 Prepare:");
    println!("{}", script::prepare_workspace(workspace));
    for artifact in &plan.artifacts {
        println!();
        println!("🔧 Install {}:", artifact.file_name);
        println!(
            "{}",
            script::install_artifact(workspace, &artifact.file_name, &artifact.stem, artifact.kind)
        );
    }
}

/// Print the per-artifact results of a finished run.
pub fn print_report(report: &RunReport) {
    println!();
    println!("📊 Deployment to {} ({})", report.target, report.phase);
    println!("================================================");

    for artifact in &report.artifacts {
        let transfer = match &artifact.transfer {
            TransferOutcome::Transferred { .. } => "transferred".to_string(),
            TransferOutcome::Skipped => "kept existing".to_string(),
            TransferOutcome::Failed { error } => format!("transfer failed: {error}"),
            TransferOutcome::Cancelled => "transfer cancelled".to_string(),
        };
        match &artifact.install {
            InstallOutcome::Installed(record) => {
                println!("  ✅ {} ({transfer})", artifact.artifact);
                for binary in &record.installed {
                    let backed_up = record.backed_up.iter().any(|b| b == binary);
                    if backed_up {
                        println!("      {binary} (previous version in bin.old)");
                    } else {
                        println!("      {binary}");
                    }
                }
                if record.installed.is_empty() {
                    println!("      no executables installed");
                }
            }
            InstallOutcome::Failed { error } => {
                println!("  ❌ {} ({transfer}): install failed: {error}", artifact.artifact);
            }
            InstallOutcome::NotAttempted => {
                println!("  ❌ {}: {transfer}", artifact.artifact);
            }
            InstallOutcome::Cancelled => {
                println!("  ⚠️  {}: cancelled ({transfer})", artifact.artifact);
            }
        }
    }

    let failures = report.failures();
    println!();
    println!(
        "Installed {} binaries, {} failed artifacts, {} cancelled",
        report.installed_binaries().len(),
        failures.len(),
        report.cancelled()
    );
    println!(
        "Duration: {:.1}s",
        (report.completed_at - report.started_at).num_milliseconds() as f64 / 1000.0
    );
}

/// Print the transcript one line per remote command or copy.
pub fn print_transcript(entries: &[TranscriptEntry]) {
    println!();
    println!("📜 Transcript:");
    for entry in entries {
        let status = if entry.success { "ok" } else { "failed" };
        let first_line = entry.detail.lines().next().unwrap_or_default();
        println!(
            "  {} [{}] {:?} {} {}",
            entry.at.format("%H:%M:%S%.3f"),
            entry.artifact.as_deref().unwrap_or("-"),
            entry.action,
            first_line,
            status
        );
    }
}

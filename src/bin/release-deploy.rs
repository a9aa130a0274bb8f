use anyhow::{bail, Context, Result};
use clap::Parser;
use release_deploy::cli::{self, ReleaseDeployCli};
use release_deploy::config::DeployConfig;
use release_deploy::deploy::{preflight, DeploymentOrchestrator};
use release_deploy::remote::{
    transporter_for, ArtifactTransporter, LocalExecutor, LocalTransporter, RemoteExecutor,
    SshExecutor,
};
use release_deploy::resolver::{ArtifactResolver, GitHubResolver, RepoId};
use release_deploy::types::{ArtifactRef, RemoteTarget};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ReleaseDeployCli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.log_level()).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting release-deploy v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => DeployConfig::load(path)?,
        None => DeployConfig::default(),
    };
    cli.apply_to(&mut config);
    config.validate(cli.localhost)?;

    let target = if cli.localhost {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        RemoteTarget::new(
            host,
            config.user.clone(),
            config.key_path.clone().unwrap_or_default(),
        )
    } else {
        config.target()?
    };
    let workspace = config.workspace();

    let artifacts = collect_artifacts(&cli).await?;
    if artifacts.is_empty() {
        warn!("Nothing to deploy");
        return Ok(());
    }

    if cli.dry_run {
        let plan = preflight::plan(&artifacts)?;
        cli::print_dry_run(&target, &workspace, &plan);
        return Ok(());
    }

    let (executor, transporter): (Arc<dyn RemoteExecutor>, Arc<dyn ArtifactTransporter>) =
        if cli.localhost {
            (Arc::new(LocalExecutor::new()), Arc::new(LocalTransporter::new()))
        } else {
            config.ensure_tools_available()?;
            let ssh = config.ssh_options();
            (
                Arc::new(SshExecutor::new(ssh.clone())),
                Arc::from(transporter_for(config.transfer_method, ssh)),
            )
        };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight transfers and skipping the rest");
            on_interrupt.cancel();
        }
    });

    let mut orchestrator = DeploymentOrchestrator::new(target, workspace, executor, transporter)
        .with_options(config.orchestrator_options())
        .with_cancellation(cancel);

    let result = orchestrator.run(&artifacts).await;
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("Deployment failed in phase {}: {}", orchestrator.phase(), e);
            return Err(e.into());
        }
    };

    cli::print_report(&report);
    if cli.verbose > 0 {
        cli::print_transcript(&report.transcript);
    }

    if let Some(path) = &cli.transcript {
        let json = serde_json::to_string_pretty(&report.transcript)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        info!("Transcript written to {}", path.display());
    }

    let failures = report.failures();
    if cli.strict && (!failures.is_empty() || report.cancelled() > 0) {
        bail!(
            "{} of {} artifacts did not deploy",
            failures.len() + report.cancelled(),
            report.artifacts.len()
        );
    }

    Ok(())
}

async fn collect_artifacts(cli: &ReleaseDeployCli) -> Result<Vec<ArtifactRef>> {
    if !cli.artifacts.is_empty() {
        return Ok(cli.artifacts.iter().cloned().map(ArtifactRef::from).collect());
    }
    if cli.repos.is_empty() {
        bail!("Nothing to deploy: pass --repo OWNER/REPO or --artifact PATH");
    }

    let repos = cli
        .repos
        .iter()
        .map(|r| r.parse::<RepoId>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut resolver = GitHubResolver::new(cli.token.clone(), &cli.download_dir)?;
    if let Some(api_url) = &cli.api_url {
        resolver = resolver.with_api_base(api_url)?;
    }
    resolver.set_match_filter(cli.match_filter.clone());

    Ok(resolver.resolve(&repos).await?)
}

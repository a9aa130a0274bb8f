use crate::config::DeployConfig;
use crate::remote::TransferMethod;
use clap::Parser;
use std::path::PathBuf;

/// Deploy the latest GitHub release artifacts to a remote host over ssh
#[derive(Parser, Debug)]
#[command(name = "release-deploy")]
#[command(about = "Fetch the latest release artifacts and install them on a remote host")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ReleaseDeployCli {
    /// Repository to deploy from (owner/repo), repeatable
    #[arg(long = "repo", value_name = "OWNER/REPO")]
    pub repos: Vec<String>,

    /// Local artifact to deploy instead of downloading, repeatable
    #[arg(long = "artifact", value_name = "PATH", conflicts_with = "repos")]
    pub artifacts: Vec<PathBuf>,

    /// YAML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Remote host name or address
    #[arg(long)]
    pub host: Option<String>,

    /// Private key used for ssh, scp and rsync
    #[arg(short, long)]
    pub key: Option<PathBuf>,

    /// Remote login user
    #[arg(short, long)]
    pub user: Option<String>,

    /// Remote ssh port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Remote home directory holding bin/ and bin.old/
    #[arg(long)]
    pub home: Option<String>,

    /// Remote directory binaries are activated into
    #[arg(long)]
    pub activation_dir: Option<String>,

    /// Only download release assets whose name contains this string
    #[arg(short = 'm', long = "match")]
    pub match_filter: Option<String>,

    /// GitHub token for private repositories and higher rate limits
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Directory release assets are downloaded into
    #[arg(long, default_value = "./downloads")]
    pub download_dir: PathBuf,

    /// Transfer tool (scp, rsync)
    #[arg(long)]
    pub method: Option<TransferMethod>,

    /// Keep files that already exist in the remote landing directory
    #[arg(long)]
    pub no_clobber: bool,

    /// Maximum transfers in flight at once
    #[arg(long)]
    pub max_transfers: Option<usize>,

    /// Extra attempts for transfers that fail in transport
    #[arg(long)]
    pub retries: Option<u32>,

    /// Skip comparing remote SHA-256 digests after transfer
    #[arg(long)]
    pub no_verify: bool,

    /// Write the run transcript as JSON to this file
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Run every step on this machine instead of over ssh
    #[arg(long)]
    pub localhost: bool,

    /// Exit non-zero when any artifact fails
    #[arg(long)]
    pub strict: bool,

    /// Show what would be deployed without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ReleaseDeployCli {
    /// Overlay flags that were given on top of `config`.
    pub fn apply_to(&self, config: &mut DeployConfig) {
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(key) = &self.key {
            config.key_path = Some(key.clone());
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(home) = &self.home {
            config.home_dir = home.clone();
        }
        if let Some(dir) = &self.activation_dir {
            config.activation_dir = dir.clone();
        }
        if let Some(method) = self.method {
            config.transfer_method = method;
        }
        if self.no_clobber {
            config.no_clobber = true;
        }
        if let Some(limit) = self.max_transfers {
            config.max_concurrent_transfers = Some(limit);
        }
        if let Some(retries) = self.retries {
            config.transfer_retries = retries;
        }
        if self.no_verify {
            config.verify_checksums = false;
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

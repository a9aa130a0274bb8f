//! Turns `owner/repo` identifiers into downloaded release artifacts.

pub mod error;
pub mod github;
pub mod release;

pub use error::*;
pub use github::GitHubResolver;
pub use release::{Release, ReleaseAsset, RepoId};

use crate::types::ArtifactRef;
use async_trait::async_trait;

#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Download the latest release assets of every repository and return
    /// their local paths, in repository order.
    async fn resolve(&self, repos: &[RepoId]) -> Result<Vec<ArtifactRef>>;
}

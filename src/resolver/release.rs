use crate::resolver::ResolverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `owner/repo` identifier of a repository that publishes releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl FromStr for RepoId {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ResolverError::InvalidRepository {
            input: s.to_string(),
        };
        let (owner, repo) = s.trim().split_once('/').ok_or_else(invalid)?;
        let valid = |part: &str| {
            !part.is_empty()
                && part != "."
                && part != ".."
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(repo) {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    /// API URL; fetching it with `Accept: application/octet-stream` returns
    /// the asset bytes and works for private repositories.
    pub url: String,
    #[serde(default)]
    pub browser_download_url: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl Release {
    /// Assets whose name contains `filter`; every asset when no filter is set.
    pub fn matching_assets<'a>(&'a self, filter: Option<&'a str>) -> impl Iterator<Item = &'a ReleaseAsset> + 'a {
        self.assets
            .iter()
            .filter(move |asset| filter.map_or(true, |f| f.is_empty() || asset.name.contains(f)))
    }
}

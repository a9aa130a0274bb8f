//! Latest-release lookup and asset download against the GitHub REST API.

use crate::remote::script;
use crate::resolver::release::{Release, ReleaseAsset, RepoId};
use crate::resolver::{ArtifactResolver, ResolverError, Result};
use crate::types::ArtifactRef;
use async_trait::async_trait;
use reqwest::{header, Client, ClientBuilder, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com/";

const API_VERSION: &str = "2022-11-28";

pub struct GitHubResolver {
    client: Client,
    api_base: Url,
    token: Option<String>,
    download_dir: PathBuf,
    match_filter: Option<String>,
}

impl GitHubResolver {
    pub fn new(token: Option<String>, download_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(concat!("release-deploy/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: Url::parse(DEFAULT_API_BASE)?,
            token: token.filter(|t| !t.is_empty()),
            download_dir: download_dir.into(),
            match_filter: None,
        })
    }

    /// Point at a GitHub Enterprise or test server instead of api.github.com.
    pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
        let mut base = api_base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.api_base = Url::parse(&base)?;
        Ok(self)
    }

    /// Only download assets whose name contains `filter`.
    pub fn set_match_filter(&mut self, filter: Option<String>) {
        self.match_filter = filter.filter(|f| !f.is_empty());
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn latest_release_url(&self, repo: &RepoId) -> Result<Url> {
        Ok(self
            .api_base
            .join(&format!("repos/{}/{}/releases/latest", repo.owner, repo.repo))?)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn latest_release(&self, repo: &RepoId) -> Result<Release> {
        let url = self.latest_release_url(repo)?;
        debug!("Fetching {}", url);

        let response = self
            .authorized(self.client.get(url.clone()))
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<Release>().await?),
            StatusCode::NOT_FOUND => Err(ResolverError::NoRelease {
                repo: repo.to_string(),
            }),
            status => Err(ResolverError::Api {
                url: url.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Stream one asset into the download directory. The file is written
    /// under a `.part` name and renamed once complete.
    pub async fn download_asset(&self, asset: &ReleaseAsset) -> Result<PathBuf> {
        script::validate_file_name(&asset.name).map_err(|_| ResolverError::InvalidAssetName {
            name: asset.name.clone(),
        })?;
        tokio::fs::create_dir_all(&self.download_dir).await?;

        let destination = self.download_dir.join(&asset.name);
        let partial = self.download_dir.join(format!("{}.part", asset.name));
        info!("Downloading {} to {}", asset.name, destination.display());

        let mut response = self
            .authorized(self.client.get(&asset.url))
            .header(header::ACCEPT, "application/octet-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ResolverError::Api {
                url: asset.url.clone(),
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if asset.size > 0 && written != asset.size {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(ResolverError::SizeMismatch {
                name: asset.name.clone(),
                expected: asset.size,
                actual: written,
            });
        }

        tokio::fs::rename(&partial, &destination).await?;
        debug!("Downloaded {} bytes for {}", written, asset.name);
        Ok(destination)
    }
}

#[async_trait]
impl ArtifactResolver for GitHubResolver {
    async fn resolve(&self, repos: &[RepoId]) -> Result<Vec<ArtifactRef>> {
        let mut artifacts = Vec::new();

        for repo in repos {
            let release = self.latest_release(repo).await?;
            info!("Latest release of {} is {}", repo, release.tag_name);

            let assets: Vec<_> = release
                .matching_assets(self.match_filter.as_deref())
                .collect();
            if assets.is_empty() {
                warn!(
                    "No assets in {} {} match {:?}",
                    repo,
                    release.tag_name,
                    self.match_filter.as_deref().unwrap_or("")
                );
                continue;
            }

            for asset in assets {
                let path = self.download_asset(asset).await?;
                artifacts.push(ArtifactRef::new(path));
            }
        }

        Ok(artifacts)
    }
}

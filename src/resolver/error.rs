use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Invalid repository {input:?}: expected owner/repo")]
    InvalidRepository { input: String },

    #[error("No published release found for {repo}")]
    NoRelease { repo: String },

    #[error("GitHub API returned {status} for {url}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Downloaded {name} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid asset name {name:?}")]
    InvalidAssetName { name: String },

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResolverError>;

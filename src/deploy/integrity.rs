//! Checksums used to verify a landed artifact against the local file.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];
    loop {
        let bytes_read = file.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a local digest with `sha256sum` output from the remote host.
pub fn digests_match(local: &str, remote_output: &str) -> bool {
    remote_output
        .split_whitespace()
        .next()
        .is_some_and(|remote| remote.eq_ignore_ascii_case(local))
}

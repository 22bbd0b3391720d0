use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;

/// Downloads `url` to `dest`. On failure any partially written file is removed.
#[tracing::instrument(skip(runtime, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    debug!("Downloading {} to {:?}...", url, dest);

    let result = http_client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create file at {:?}", dest))
        })
        .await;

    match result {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            if runtime.exists(dest) {
                debug!("Removing partial download {:?}", dest);
                if let Err(rm) = runtime.remove_file(dest) {
                    warn!("Failed to remove partial download {:?}: {:#}", dest, rm);
                }
            }
            Err(e.context(format!("Failed to download {}", url)))
        }
    }
}

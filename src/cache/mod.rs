//! Filename-keyed download cache for release archives.
//!
//! An archive that already exists under the cache root is reused as is. There
//! is no checksum, staleness check or eviction: if a cached archive turns out
//! to be corrupt, remove it with `sn-libs cache clear <name>`.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::cleanup::{self, SharedCleanupContext};
use crate::download::download_file;
use crate::github::ReleaseAsset;
use crate::http::HttpClient;
use crate::runtime::Runtime;

pub const CACHE_DIR_NAME: &str = ".sn-cache";
pub const DOWNLOADS_DIR_NAME: &str = "downloads";

/// `<home>/.sn-cache/downloads`
pub fn default_cache_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home = runtime
        .home_dir()
        .ok_or_else(|| anyhow!("Could not determine the home directory for the download cache"))?;
    Ok(home.join(CACHE_DIR_NAME).join(DOWNLOADS_DIR_NAME))
}

/// A cached archive as reported by [`DownloadCache::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub size: u64,
}

pub struct DownloadCache {
    root: PathBuf,
}

impl DownloadCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name an asset is stored under: the asset name, or the last
    /// segment of its download URL when the name is not a plain file name.
    pub fn cache_key(asset: &ReleaseAsset) -> Result<String> {
        if is_plain_file_name(&asset.name) {
            return Ok(asset.name.clone());
        }

        let from_url = asset
            .browser_download_url
            .split(['?', '#'])
            .next()
            .and_then(|url| url.rsplit('/').next())
            .unwrap_or_default();

        if is_plain_file_name(from_url) {
            Ok(from_url.to_string())
        } else {
            bail!(
                "Cannot derive a cache file name for asset '{}' ({})",
                asset.name,
                asset.browser_download_url
            )
        }
    }

    pub fn path_for(&self, asset: &ReleaseAsset) -> Result<PathBuf> {
        Ok(self.root.join(Self::cache_key(asset)?))
    }

    /// Return the cached archive for `asset`, downloading it first on a miss.
    #[tracing::instrument(skip(self, runtime, http_client, cleanup_ctx))]
    pub async fn ensure_cached<R: Runtime>(
        &self,
        runtime: &R,
        asset: &ReleaseAsset,
        http_client: &HttpClient,
        cleanup_ctx: &SharedCleanupContext,
    ) -> Result<PathBuf> {
        let path = self.path_for(asset)?;

        if runtime.exists(&path) {
            info!("Using cached archive {:?}", path);
            return Ok(path);
        }

        if !runtime.exists(&self.root) {
            debug!("Creating cache directory {:?}", self.root);
            runtime
                .create_dir_all(&self.root)
                .with_context(|| format!("Failed to create cache directory {:?}", self.root))?;
        }

        cleanup::register(cleanup_ctx, &path);
        let result = download_file(runtime, &asset.browser_download_url, &path, http_client).await;
        cleanup::unregister(cleanup_ctx, &path);

        let bytes = result?;
        info!("Cached {} ({} bytes) at {:?}", asset.name, bytes, path);
        Ok(path)
    }

    /// Cached archives sorted by name. A missing cache root is an empty cache.
    #[tracing::instrument(skip(self, runtime))]
    pub fn list<R: Runtime>(&self, runtime: &R) -> Result<Vec<CacheEntry>> {
        if !runtime.exists(&self.root) {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for path in runtime.read_dir(&self.root)? {
            if !runtime.is_file(&path) {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            entries.push(CacheEntry {
                name: name.to_string_lossy().into_owned(),
                size: runtime.file_size(&path)?,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Remove one named archive, or every cached archive when `name` is `None`.
    /// Returns the number of files removed.
    #[tracing::instrument(skip(self, runtime))]
    pub fn clear<R: Runtime>(&self, runtime: &R, name: Option<&str>) -> Result<usize> {
        match name {
            Some(name) => {
                if !is_plain_file_name(name) {
                    bail!("Invalid cache entry name '{}'", name);
                }
                let path = self.root.join(name);
                if !runtime.is_file(&path) {
                    bail!("No cached archive named '{}' in {:?}", name, self.root);
                }
                runtime.remove_file(&path)?;
                Ok(1)
            }
            None => {
                let entries = self.list(runtime)?;
                for entry in &entries {
                    runtime.remove_file(&self.root.join(&entry.name))?;
                }
                Ok(entries.len())
            }
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::repo::GitHubRepo;
use super::types::Release;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GetReleases: Send + Sync {
    /// Fetch the latest published release of `repo`.
    async fn get_latest_release(&self, repo: &GitHubRepo) -> Result<Release>;
    fn api_url(&self) -> &str;
}

pub struct GitHub {
    pub http_client: HttpClient,
    pub api_url: String,
}

impl GitHub {
    #[tracing::instrument(skip(http_client, api_url))]
    pub fn new(http_client: HttpClient, api_url: Option<String>) -> Self {
        let api_url = api_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            http_client,
            api_url,
        }
    }

    #[tracing::instrument(skip(http_client, api_url))]
    pub async fn fetch_latest_release(
        repo: &GitHubRepo,
        http_client: &HttpClient,
        api_url: &str,
    ) -> Result<Release> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            api_url, repo.owner, repo.repo
        );

        debug!("Fetching latest release from {}...", url);

        let release: Release = http_client.get_json(&url).await?;

        if release.tag_name.trim().is_empty() {
            bail!("Latest release of {} has no tag name", repo);
        }

        debug!(
            "Latest release of {} is {} with {} asset(s)",
            repo,
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }
}

#[async_trait]
impl GetReleases for GitHub {
    #[tracing::instrument(skip(self, repo))]
    async fn get_latest_release(&self, repo: &GitHubRepo) -> Result<Release> {
        GitHub::fetch_latest_release(repo, &self.http_client, &self.api_url).await
    }

    fn api_url(&self) -> &str {
        &self.api_url
    }
}

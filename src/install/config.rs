use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::path::PathBuf;

use crate::{
    archive::{ArchiveExtractor, Extractor},
    cache::default_cache_root,
    github::{DEFAULT_REPO, GetReleases, GitHub, GitHubRepo},
    http::HttpClient,
    platform::PlatformId,
    runtime::Runtime,
};

pub const USER_AGENT: &str = concat!("sn-libs/", env!("SN_LIBS_VERSION"));

/// Directory under the working directory that holds per-platform installs.
pub const LIBS_DIR_NAME: &str = "libs";

/// User-supplied overrides for an install run. `None` means "detect".
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub platform: Option<PlatformId>,
    pub repo: String,
    pub api_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub dest: Option<PathBuf>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            platform: None,
            repo: DEFAULT_REPO.to_string(),
            api_url: None,
            cache_dir: None,
            dest: None,
        }
    }
}

/// Everything an install run needs, resolved up front.
pub struct InstallConfig<R: Runtime, G: GetReleases, E: Extractor> {
    pub runtime: R,
    pub github: G,
    pub http_client: HttpClient,
    pub extractor: E,
    pub repo: GitHubRepo,
    pub platform: PlatformId,
    pub cache_root: PathBuf,
    pub install_dir: PathBuf,
}

impl<R: Runtime> InstallConfig<R, GitHub, ArchiveExtractor> {
    #[tracing::instrument(skip(runtime))]
    pub fn new(runtime: R, options: InstallOptions) -> Result<Self> {
        let repo = options.repo.parse::<GitHubRepo>()?;

        let platform = match options.platform {
            Some(platform) => platform,
            None => PlatformId::detect(&runtime)?,
        };

        let cache_root = match options.cache_dir {
            Some(dir) => dir,
            None => default_cache_root(&runtime)?,
        };

        let libs_root = match options.dest {
            Some(dir) => dir,
            None => runtime
                .current_dir()
                .context("Failed to determine the working directory")?
                .join(LIBS_DIR_NAME),
        };
        let install_dir = libs_root.join(platform.os_token());

        let client = build_client(&runtime)?;
        let http_client = HttpClient::new(client);
        let github = GitHub::new(http_client.clone(), options.api_url);

        Ok(Self {
            runtime,
            github,
            http_client,
            extractor: ArchiveExtractor::new(),
            repo,
            platform,
            cache_root,
            install_dir,
        })
    }
}

/// HTTP client with the tool's user agent and, when `GITHUB_TOKEN` is set,
/// a bearer token on every request.
pub fn build_client<R: Runtime>(runtime: &R) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Ok(token) = runtime.env_var("GITHUB_TOKEN")
        && !token.trim().is_empty()
    {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .context("GITHUB_TOKEN contains characters not allowed in a header")?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        debug!("Using GITHUB_TOKEN for authentication: {}", mask_token(&token));
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .context("Failed to build HTTP client")
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.trim().chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use mockito::Server;
    use std::env::VarError;

    fn mock_runtime(token: Option<&'static str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("GITHUB_TOKEN"))
            .returning(move |_| token.map(str::to_string).ok_or(VarError::NotPresent));
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/work/project")));
        runtime
            .expect_kernel_name()
            .returning(|| Ok("Linux".to_string()));
        runtime
    }

    #[test]
    #[cfg(unix)]
    fn test_config_defaults() {
        let config = InstallConfig::new(mock_runtime(None), InstallOptions::default()).unwrap();

        assert_eq!(config.platform, PlatformId::Linux);
        assert_eq!(config.repo.to_string(), DEFAULT_REPO);
        assert_eq!(
            config.cache_root,
            PathBuf::from("/home/user/.sn-cache/downloads")
        );
        assert_eq!(
            config.install_dir,
            PathBuf::from("/work/project/libs/linux")
        );
        assert_eq!(config.github.api_url(), "https://api.github.com");
    }

    #[test]
    fn test_config_overrides() {
        let options = InstallOptions {
            platform: Some(PlatformId::Macos),
            repo: "acme/prebuilt".to_string(),
            api_url: Some("http://localhost:1234/".to_string()),
            cache_dir: Some(PathBuf::from("/tmp/cache")),
            dest: Some(PathBuf::from("/opt/deps")),
        };
        let config = InstallConfig::new(mock_runtime(None), options).unwrap();

        assert_eq!(config.platform, PlatformId::Macos);
        assert_eq!(config.repo.owner, "acme");
        assert_eq!(config.cache_root, PathBuf::from("/tmp/cache"));
        assert_eq!(config.install_dir, PathBuf::from("/opt/deps/darwin"));
        assert_eq!(config.github.api_url(), "http://localhost:1234");
    }

    #[test]
    #[cfg(unix)]
    fn test_config_rejects_unsupported_kernel() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_kernel_name()
            .returning(|| Ok("FreeBSD".to_string()));

        let err = InstallConfig::new(runtime, InstallOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unsupported operating system"));
    }

    #[test]
    #[cfg(unix)]
    fn test_config_rejects_bad_repo() {
        let options = InstallOptions {
            repo: "not-a-repo".to_string(),
            ..InstallOptions::default()
        };
        assert!(InstallConfig::new(mock_runtime(None), options).is_err());
    }

    #[tokio::test]
    async fn test_client_sends_github_token() {
        let token = "ghp_0123456789abcdef";
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("Authorization", format!("Bearer {}", token).as_str())
            .match_header("User-Agent", USER_AGENT)
            .create_async()
            .await;

        let client = build_client(&mock_runtime(Some(token))).unwrap();
        let _ = client.get(server.url()).send().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_without_token_sends_no_auth() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("Authorization", mockito::Matcher::Missing)
            .create_async()
            .await;

        let client = build_client(&mock_runtime(None)).unwrap();
        let _ = client.get(server.url()).send().await;

        mock.assert_async().await;
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "*********");
        assert_eq!(mask_token("ghp_0123456789abcdef"), "ghp_*********cdef");
    }
}

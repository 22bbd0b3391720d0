//! The release installer: latest release → platform asset → cache → install dir.

use anyhow::Result;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::{
    archive::{ArchiveFormat, Extractor},
    asset::select_asset,
    cache::DownloadCache,
    cleanup::{self, SharedCleanupContext},
    github::{GetReleases, GitHubRepo, ReleaseAsset},
    http::HttpClient,
    platform::PlatformId,
    runtime::Runtime,
    ui,
};

pub mod config;
pub mod layout;

pub use config::{InstallConfig, InstallOptions};
pub use layout::{Layout, install_archive};

/// What an install run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub tag_name: String,
    pub asset_name: String,
    pub archive: PathBuf,
    pub install_dir: PathBuf,
    /// `false` when the archive came from the cache.
    pub downloaded: bool,
    /// Number of top-level entries placed in the install directory.
    pub entries: usize,
}

#[tracing::instrument(skip(runtime))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    options: InstallOptions,
) -> Result<InstallReport> {
    let config = InstallConfig::new(runtime, options)?;
    run(config).await
}

#[tracing::instrument(skip(config))]
pub async fn run<R: Runtime + 'static, G: GetReleases, E: Extractor>(
    config: InstallConfig<R, G, E>,
) -> Result<InstallReport> {
    let installer = Installer::new(
        config.runtime,
        config.github,
        config.http_client,
        config.extractor,
    );
    installer
        .install(
            &config.repo,
            config.platform,
            &config.cache_root,
            &config.install_dir,
        )
        .await
}

pub struct Installer<R: Runtime, G: GetReleases, E: Extractor> {
    pub runtime: R,
    pub github: G,
    pub http_client: HttpClient,
    pub extractor: E,
}

impl<R: Runtime + 'static, G: GetReleases, E: Extractor> Installer<R, G, E> {
    #[tracing::instrument(skip(runtime, github, http_client, extractor))]
    pub fn new(runtime: R, github: G, http_client: HttpClient, extractor: E) -> Self {
        Self {
            runtime,
            github,
            http_client,
            extractor,
        }
    }

    /// Install the latest release of `repo` for `platform` into `install_dir`,
    /// replacing whatever was there.
    #[tracing::instrument(skip(self))]
    pub async fn install(
        &self,
        repo: &GitHubRepo,
        platform: PlatformId,
        cache_root: &Path,
        install_dir: &Path,
    ) -> Result<InstallReport> {
        ui::step("Platform", platform);
        ui::step("Resolving", format!("latest release of {}", repo));
        debug!("Using GitHub API at {}", self.github.api_url());

        let release = self.github.get_latest_release(repo).await?;
        info!("Found release: {}", release.tag_name);

        let pattern = platform.asset_pattern()?;
        let asset = select_asset(&release, &pattern, platform)?;
        ui::step("Selected", format!("{} ({})", asset.name, release.tag_name));

        if ArchiveFormat::from_path(Path::new(&asset.name)) != Some(platform.archive_format()) {
            ui::warn(format!(
                "Asset {} does not look like a {:?} archive",
                asset.name,
                platform.archive_format()
            ));
        }

        let cache = DownloadCache::new(cache_root.to_path_buf());
        let cached_path = cache.path_for(asset)?;
        let downloaded = !self.runtime.exists(&cached_path);

        let cleanup_ctx = cleanup::new_shared();
        let ctrl_c_handler = cleanup::spawn_interrupt_handler(cleanup_ctx.clone());

        let result = self
            .fetch_and_place(&cache, asset, install_dir, downloaded, cleanup_ctx)
            .await;

        ctrl_c_handler.abort();

        let (archive, entries) = result?;
        debug!("Placed {} entries into {:?}", entries, install_dir);

        ui::success(format!(
            "{} installed to {}",
            release.tag_name,
            install_dir.display()
        ));

        Ok(InstallReport {
            tag_name: release.tag_name.clone(),
            asset_name: asset.name.clone(),
            archive,
            install_dir: install_dir.to_path_buf(),
            downloaded,
            entries,
        })
    }

    async fn fetch_and_place(
        &self,
        cache: &DownloadCache,
        asset: &ReleaseAsset,
        install_dir: &Path,
        downloaded: bool,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<(PathBuf, usize)> {
        if downloaded {
            ui::step("Downloading", &asset.browser_download_url);
        } else {
            ui::step("Cached", cache.path_for(asset)?.display());
        }
        let archive = cache
            .ensure_cached(&self.runtime, asset, &self.http_client, &cleanup_ctx)
            .await?;

        ui::step("Extracting", install_dir.display());
        let entries = install_archive(
            &self.runtime,
            &self.extractor,
            &archive,
            install_dir,
            cleanup_ctx,
        )?;
        Ok((archive, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveExtractor;
    use crate::archive::test_archives::{write_tar_gz, write_zip};
    use crate::github::{MockGetReleases, Release};
    use crate::runtime::RealRuntime;
    use reqwest::Client;
    use std::fs;
    use tempfile::tempdir;

    fn test_repo() -> GitHubRepo {
        GitHubRepo {
            owner: "sindarin-lang".to_string(),
            repo: "sindarin-libs".to_string(),
        }
    }

    fn release(server_url: &str, names: &[&str]) -> Release {
        Release {
            tag_name: "v2.1.0".to_string(),
            assets: names
                .iter()
                .map(|name| ReleaseAsset {
                    name: name.to_string(),
                    browser_download_url: format!("{}/download/{}", server_url, name),
                })
                .collect(),
        }
    }

    fn installer(release: Release) -> Installer<RealRuntime, MockGetReleases, ArchiveExtractor> {
        let mut github = MockGetReleases::new();
        github
            .expect_get_latest_release()
            .returning(move |_| Ok(release.clone()));
        Installer::new(
            RealRuntime,
            github,
            HttpClient::new(Client::new()),
            ArchiveExtractor::new(),
        )
    }

    fn archive_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.tar.gz");
        write_tar_gz(&path, files).unwrap();
        fs::read(path).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_install_is_idempotent_and_second_run_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let download = server
            .mock("GET", "/download/libs-linux.tar.gz")
            .with_status(200)
            .with_body(archive_bytes(&[("payload/a.txt", "a"), ("payload/.env", "K=V")]))
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let cache_root = dir.path().join("cache");
        let install_dir = dir.path().join("libs/linux");
        let installer = installer(release(&server.url(), &["libs-linux.tar.gz"]));

        let first = installer
            .install(&test_repo(), PlatformId::Linux, &cache_root, &install_dir)
            .await
            .unwrap();
        let second = installer
            .install(&test_repo(), PlatformId::Linux, &cache_root, &install_dir)
            .await
            .unwrap();

        download.assert_async().await;
        assert!(first.downloaded);
        assert!(!second.downloaded);
        assert_eq!(first.entries, 2);
        assert_eq!(second.archive, cache_root.join("libs-linux.tar.gz"));
        assert_eq!(fs::read_to_string(install_dir.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(install_dir.join(".env")).unwrap(), "K=V");
        assert!(!dir.path().join("libs/.linux.extract").exists());
    }

    #[tokio::test]
    async fn test_install_uses_preexisting_cache_entry() {
        let mut server = mockito::Server::new_async().await;
        let download = server
            .mock("GET", "/download/libs-darwin.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let cache_root = dir.path().join("cache");
        fs::create_dir_all(&cache_root).unwrap();
        write_tar_gz(
            &cache_root.join("libs-darwin.tar.gz"),
            &[("lib/libz.a", "z"), ("include/zlib.h", "h")],
        )
        .unwrap();
        let install_dir = dir.path().join("libs/darwin");

        let report = installer(release(&server.url(), &["libs-darwin.tar.gz"]))
            .install(&test_repo(), PlatformId::Macos, &cache_root, &install_dir)
            .await
            .unwrap();

        download.assert_async().await;
        assert!(!report.downloaded);
        assert!(install_dir.join("lib/libz.a").is_file());
        assert!(install_dir.join("include/zlib.h").is_file());
    }

    #[tokio::test]
    async fn test_install_picks_first_matching_asset() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/download/a-linux.tar.gz")
            .with_status(200)
            .with_body(archive_bytes(&[("first.txt", "1")]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/download/b-linux.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let install_dir = dir.path().join("libs/linux");
        let report = installer(release(
            &server.url(),
            &["libs-windows.zip", "a-linux.tar.gz", "b-linux.tar.gz"],
        ))
        .install(
            &test_repo(),
            PlatformId::Linux,
            &dir.path().join("cache"),
            &install_dir,
        )
        .await
        .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(report.asset_name, "a-linux.tar.gz");
        assert!(install_dir.join("first.txt").is_file());
    }

    #[tokio::test]
    async fn test_install_windows_zip() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("src.zip");
        write_zip(&zip_path, &[("windows/lib/libz.a", "z")]).unwrap();

        let mut server = mockito::Server::new_async().await;
        let _download = server
            .mock("GET", "/download/Libs-Windows-x64.ZIP")
            .with_status(200)
            .with_body(fs::read(&zip_path).unwrap())
            .create_async()
            .await;

        let install_dir = dir.path().join("libs/windows");
        installer(release(&server.url(), &["Libs-Windows-x64.ZIP"]))
            .install(
                &test_repo(),
                PlatformId::Windows,
                &dir.path().join("cache"),
                &install_dir,
            )
            .await
            .unwrap();

        assert!(install_dir.join("lib/libz.a").is_file());
    }

    #[test_log::test(tokio::test)]
    async fn test_install_asset_with_unknown_extension_fails_at_extraction() {
        let mut server = mockito::Server::new_async().await;
        let _download = server
            .mock("GET", "/download/libs-linux.tar.gz.sig")
            .with_status(200)
            .with_body("signature")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let install_dir = dir.path().join("libs/linux");
        let err = installer(release(&server.url(), &["libs-linux.tar.gz.sig"]))
            .install(
                &test_repo(),
                PlatformId::Linux,
                &dir.path().join("cache"),
                &install_dir,
            )
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Unsupported archive format"));
        assert!(!dir.path().join("libs/.linux.extract").exists());
    }

    #[tokio::test]
    async fn test_install_without_matching_asset_fails_before_touching_disk() {
        let dir = tempdir().unwrap();
        let install_dir = dir.path().join("libs/linux");
        fs::create_dir_all(&install_dir).unwrap();
        fs::write(install_dir.join("keep.txt"), "keep").unwrap();

        let err = installer(release(
            "http://127.0.0.1:9",
            &["libs-darwin.tar.gz", "libs-windows.zip"],
        ))
        .install(
            &test_repo(),
            PlatformId::Linux,
            &dir.path().join("cache"),
            &install_dir,
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("No release asset found for platform linux"));
        assert!(message.contains("libs-windows.zip"));
        assert!(install_dir.join("keep.txt").is_file());
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn test_install_propagates_release_lookup_failure() {
        let mut github = MockGetReleases::new();
        github
            .expect_get_latest_release()
            .returning(|_| Err(anyhow::anyhow!("Rate limit exceeded")));
        let installer = Installer::new(
            RealRuntime,
            github,
            HttpClient::new(Client::new()),
            ArchiveExtractor::new(),
        );

        let dir = tempdir().unwrap();
        let err = installer
            .install(
                &test_repo(),
                PlatformId::Linux,
                &dir.path().join("cache"),
                &dir.path().join("libs/linux"),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Rate limit"));
    }

    #[tokio::test]
    async fn test_install_download_failure_leaves_no_cache_entry() {
        let mut server = mockito::Server::new_async().await;
        let _download = server
            .mock("GET", "/download/libs-linux.tar.gz")
            .with_status(503)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let cache_root = dir.path().join("cache");
        let result = installer(release(&server.url(), &["libs-linux.tar.gz"]))
            .install(
                &test_repo(),
                PlatformId::Linux,
                &cache_root,
                &dir.path().join("libs/linux"),
            )
            .await;

        assert!(result.is_err());
        assert!(!cache_root.join("libs-linux.tar.gz").exists());
    }
}

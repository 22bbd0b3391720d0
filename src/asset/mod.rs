//! Release asset selection by platform name pattern.

use anyhow::{Context, Result, bail};
use glob::{MatchOptions, Pattern};

use crate::github::{Release, ReleaseAsset};
use crate::platform::PlatformId;

/// Pattern an asset name has to match to be installed on a platform.
#[derive(Debug, Clone)]
pub enum AssetPattern {
    /// Plain substring match, case sensitive.
    Contains(String),
    /// Shell-style glob over the whole name, case insensitive.
    Glob(Pattern),
}

impl AssetPattern {
    pub fn glob(pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid asset pattern '{}'", pattern))?;
        Ok(AssetPattern::Glob(pattern))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            AssetPattern::Contains(needle) => name.contains(needle.as_str()),
            AssetPattern::Glob(pattern) => pattern.matches_with(
                name,
                MatchOptions {
                    case_sensitive: false,
                    ..MatchOptions::new()
                },
            ),
        }
    }
}

impl std::fmt::Display for AssetPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetPattern::Contains(needle) => write!(f, "*{}*", needle),
            AssetPattern::Glob(pattern) => write!(f, "{}", pattern),
        }
    }
}

/// Pick the first asset, in API order, whose name matches `pattern`.
#[tracing::instrument(skip(release, pattern))]
pub fn select_asset<'a>(
    release: &'a Release,
    pattern: &AssetPattern,
    platform: PlatformId,
) -> Result<&'a ReleaseAsset> {
    if let Some(asset) = release.assets.iter().find(|a| pattern.matches(&a.name)) {
        return Ok(asset);
    }

    let available = if release.assets.is_empty() {
        "(none)".to_string()
    } else {
        release
            .assets
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("\n  ")
    };
    bail!(
        "No release asset found for platform {} in {} (expected a name matching {}).\nAvailable assets:\n  {}",
        platform,
        release.tag_name,
        pattern,
        available
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            browser_download_url: format!("https://example.com/download/{}", name),
        }
    }

    fn release(names: &[&str]) -> Release {
        Release {
            tag_name: "v1.0.0".to_string(),
            assets: names.iter().map(|n| asset(n)).collect(),
        }
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let pattern = AssetPattern::Contains("linux.tar.gz".into());
        assert!(pattern.matches("libs-linux.tar.gz"));
        assert!(!pattern.matches("libs-LINUX.tar.gz"));
        assert!(!pattern.matches("libs-linux.zip"));
    }

    #[test]
    fn test_glob_is_case_insensitive() {
        let pattern = AssetPattern::glob("*windows*.zip").unwrap();
        assert!(pattern.matches("libs-windows-x64.zip"));
        assert!(pattern.matches("libs-Windows.ZIP"));
        assert!(!pattern.matches("libs-windows.zip.sha256"));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(AssetPattern::glob("[windows").is_err());
    }

    #[test]
    fn test_select_first_match_wins() {
        let release = release(&[
            "checksums.txt",
            "libs-v1-linux.tar.gz",
            "libs-v1-debug-linux.tar.gz",
        ]);
        let pattern = PlatformId::Linux.asset_pattern().unwrap();

        let selected = select_asset(&release, &pattern, PlatformId::Linux).unwrap();
        assert_eq!(selected.name, "libs-v1-linux.tar.gz");
    }

    #[test]
    fn test_select_windows_asset() {
        let release = release(&["libs-linux.tar.gz", "libs-windows.zip"]);
        let pattern = PlatformId::Windows.asset_pattern().unwrap();

        let selected = select_asset(&release, &pattern, PlatformId::Windows).unwrap();
        assert_eq!(selected.name, "libs-windows.zip");
    }

    #[test]
    fn test_select_no_match() {
        let release = release(&["libs-linux.tar.gz", "libs-windows.zip"]);
        let pattern = PlatformId::Macos.asset_pattern().unwrap();

        let err = select_asset(&release, &pattern, PlatformId::Macos).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No release asset found for platform macos"));
        assert!(msg.contains("libs-linux.tar.gz"));
    }

    #[test]
    fn test_select_no_assets() {
        let release = release(&[]);
        let pattern = PlatformId::Linux.asset_pattern().unwrap();

        let err = select_asset(&release, &pattern, PlatformId::Linux).unwrap_err();
        assert!(err.to_string().contains("(none)"));
    }
}

//! Host platform and vcpkg build triplet detection.

use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

use crate::archive::ArchiveFormat;
use crate::asset::AssetPattern;
use crate::runtime::Runtime;

/// The platforms sindarin-libs publishes prebuilt libraries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformId {
    Linux,
    Macos,
    Windows,
}

impl PlatformId {
    /// Detect the platform of the running host.
    ///
    /// Windows builds always report [`PlatformId::Windows`]; everywhere else the
    /// kernel name decides, and anything that is neither Linux nor Darwin fails.
    #[tracing::instrument(skip(runtime))]
    pub fn detect<R: Runtime>(runtime: &R) -> Result<Self> {
        if cfg!(windows) {
            return Ok(PlatformId::Windows);
        }
        let kernel = runtime.kernel_name()?;
        Self::from_kernel_name(&kernel)
    }

    /// Map a `uname -s` style kernel name to a platform.
    pub fn from_kernel_name(kernel: &str) -> Result<Self> {
        if kernel.starts_with("Linux") {
            Ok(PlatformId::Linux)
        } else if kernel.starts_with("Darwin") {
            Ok(PlatformId::Macos)
        } else {
            bail!("Unsupported operating system: {}", kernel)
        }
    }

    /// OS token used both in release asset names and as the install directory name.
    pub fn os_token(&self) -> &'static str {
        match self {
            PlatformId::Linux => "linux",
            PlatformId::Macos => "darwin",
            PlatformId::Windows => "windows",
        }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            PlatformId::Windows => ArchiveFormat::Zip,
            PlatformId::Linux | PlatformId::Macos => ArchiveFormat::TarGz,
        }
    }

    /// Pattern the release asset for this platform must match.
    pub fn asset_pattern(&self) -> Result<AssetPattern> {
        match self {
            PlatformId::Windows => AssetPattern::glob("*windows*.zip"),
            PlatformId::Linux | PlatformId::Macos => Ok(AssetPattern::Contains(format!(
                "{}.tar.gz",
                self.os_token()
            ))),
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformId::Linux => "linux",
            PlatformId::Macos => "macos",
            PlatformId::Windows => "windows",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PlatformId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(PlatformId::Linux),
            "macos" | "darwin" | "osx" => Ok(PlatformId::Macos),
            "windows" | "win" => Ok(PlatformId::Windows),
            _ => Err(anyhow!(
                "Unknown platform '{}'. Expected one of: linux, macos, windows",
                s
            )),
        }
    }
}

/// vcpkg triplet naming the target OS, CPU and linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTriplet(String);

impl BuildTriplet {
    pub fn for_host(platform: PlatformId, arch: &str) -> Self {
        let triplet = match platform {
            PlatformId::Windows => "x64-mingw-static",
            PlatformId::Macos if matches!(arch, "arm64" | "aarch64") => "arm64-osx",
            PlatformId::Macos => "x64-osx",
            PlatformId::Linux => "x64-linux",
        };
        BuildTriplet(triplet.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BuildTriplet {
    fn from(value: String) -> Self {
        BuildTriplet(value)
    }
}

impl fmt::Display for BuildTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

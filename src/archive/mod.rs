mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use anyhow::{Result, anyhow, bail};
use std::path::{Component, Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Archive formats release assets are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Guess the format from a file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Unpacks an archive verbatim into a directory.
pub trait Extractor: Send + Sync {
    /// Extract the full archive contents into `extract_to`, which must exist.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
#[derive(Default)]
pub struct ArchiveExtractor {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for ArchiveExtractor {
    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        match ArchiveFormat::from_path(archive_path) {
            Some(ArchiveFormat::TarGz) => self.tar_gz.extract(runtime, archive_path, extract_to),
            Some(ArchiveFormat::Zip) => self.zip.extract(runtime, archive_path, extract_to),
            None => Err(anyhow!(
                "Unsupported archive format: {}",
                archive_path.display()
            )),
        }
    }
}

/// Reduce an archive entry path to plain relative components.
/// Returns `None` for absolute paths or paths that climb out with `..`.
pub(crate) fn sanitize_entry_path(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Fail if writing `entry_path` under `root` would pass through a symlink
/// created by an earlier entry.
pub(crate) fn ensure_no_symlink_on_path<R: Runtime>(
    runtime: &R,
    root: &Path,
    entry_path: &Path,
) -> Result<()> {
    let mut current = root.to_path_buf();
    for component in entry_path.components() {
        current.push(component);
        if runtime.is_symlink(&current) {
            bail!(
                "Refusing to extract {:?}: {:?} is a symbolic link",
                entry_path,
                current
            );
        }
    }
    Ok(())
}

/// Whether a link at `entry_path` pointing to `target` stays inside the
/// extraction root. Absolute targets never do.
pub(crate) fn link_target_is_contained(entry_path: &Path, target: &Path) -> bool {
    let mut depth = entry_path.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(up) => depth = up,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Create the symlink `entry_path -> target` under `root`, refusing targets
/// that leave it.
pub(crate) fn create_contained_symlink<R: Runtime>(
    runtime: &R,
    root: &Path,
    entry_path: &Path,
    target: &Path,
) -> Result<()> {
    if !link_target_is_contained(entry_path, target) {
        bail!(
            "Refusing symlink {:?} -> {:?}: target is outside the archive",
            entry_path,
            target
        );
    }
    let full_path = root.join(entry_path);
    if let Some(parent) = full_path.parent() {
        runtime.create_dir_all(parent)?;
    }
    runtime.symlink(target, &full_path)
}

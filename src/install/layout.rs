//! Placing extracted archive contents into the install directory.

use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::archive::Extractor;
use crate::cleanup::{ScratchDir, SharedCleanupContext};
use crate::runtime::Runtime;

/// Shape of an extracted archive's top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// A single top-level directory (not a link to one); its children are
    /// the payload.
    Wrapped(PathBuf),
    /// Anything else; every top-level entry is part of the payload.
    Unwrapped(Vec<PathBuf>),
}

impl Layout {
    /// Inspect the top level of `extracted`. An empty directory is an error.
    pub fn detect<R: Runtime>(runtime: &R, extracted: &Path) -> Result<Self> {
        let mut entries = runtime
            .read_dir(extracted)
            .with_context(|| format!("Failed to list extracted files in {:?}", extracted))?;
        entries.sort();

        match entries.as_slice() {
            [] => bail!("Archive appears to be empty."),
            [single] if runtime.is_dir(single) && !runtime.is_symlink(single) => {
                Ok(Layout::Wrapped(single.clone()))
            }
            _ => Ok(Layout::Unwrapped(entries)),
        }
    }

    /// Paths to move into the install directory, dot-entries included.
    pub fn payload<R: Runtime>(&self, runtime: &R) -> Result<Vec<PathBuf>> {
        match self {
            Layout::Wrapped(dir) => {
                let mut items = runtime.read_dir(dir)?;
                items.sort();
                Ok(items)
            }
            Layout::Unwrapped(entries) => Ok(entries.clone()),
        }
    }
}

/// Move every payload item of `layout` directly under `dest`.
pub fn move_payload<R: Runtime>(runtime: &R, layout: &Layout, dest: &Path) -> Result<usize> {
    let items = layout.payload(runtime)?;
    for item in &items {
        let name = item
            .file_name()
            .with_context(|| format!("Extracted entry {:?} has no file name", item))?;
        let target = dest.join(name);
        debug!("Installing {:?}", target);
        runtime.rename(item, &target)?;
    }
    Ok(items.len())
}

/// Scratch location used while extracting into `install_dir`: a hidden
/// sibling, so payload moves stay on one filesystem.
pub fn scratch_dir_for(install_dir: &Path) -> Result<PathBuf> {
    let name = install_dir
        .file_name()
        .with_context(|| format!("Install directory {:?} has no final component", install_dir))?;
    Ok(install_dir.with_file_name(format!(".{}.extract", name.to_string_lossy())))
}

/// Replace `install_dir` with the contents of `archive`.
///
/// The install directory is removed and recreated first, the archive is
/// unpacked into a scratch directory, and a single wrapping directory is
/// flattened away. The scratch directory is removed on every exit path.
#[tracing::instrument(skip(runtime, extractor, cleanup_ctx))]
pub fn install_archive<R: Runtime + 'static, E: Extractor>(
    runtime: &R,
    extractor: &E,
    archive: &Path,
    install_dir: &Path,
    cleanup_ctx: SharedCleanupContext,
) -> Result<usize> {
    if runtime.exists(install_dir) {
        debug!("Removing previous installation {:?}", install_dir);
        runtime
            .remove_dir_all(install_dir)
            .with_context(|| format!("Failed to clear {:?}", install_dir))?;
    }
    runtime
        .create_dir_all(install_dir)
        .with_context(|| format!("Failed to create {:?}", install_dir))?;

    let scratch = ScratchDir::create(runtime, scratch_dir_for(install_dir)?, cleanup_ctx)?;

    extractor
        .extract(runtime, archive, scratch.path())
        .with_context(|| {
            format!(
                "Failed to extract {:?}. If this archive came from the cache, remove it and retry.",
                archive
            )
        })?;

    let layout = Layout::detect(runtime, scratch.path())?;
    debug!("Archive layout: {:?}", layout);

    move_payload(runtime, &layout, install_dir)
}

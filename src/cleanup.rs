use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::runtime::Runtime;

/// Tracks paths that need cleanup on interruption
#[derive(Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to be cleaned up on interruption
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Remove a path from cleanup list (e.g., when operation succeeds)
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Clean up all registered paths
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Type alias for shared cleanup context
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

/// Create a new shared cleanup context
pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

pub(crate) fn register(ctx: &SharedCleanupContext, path: &Path) {
    if let Ok(mut guard) = ctx.lock() {
        guard.add(path.to_path_buf());
    }
}

pub(crate) fn unregister(ctx: &SharedCleanupContext, path: &Path) {
    if let Ok(mut guard) = ctx.lock() {
        guard.remove(path);
    }
}

/// Spawn a task that removes every registered path and exits with status 130
/// when Ctrl-C arrives. Abort the returned handle once the guarded work is done.
pub fn spawn_interrupt_handler(ctx: SharedCleanupContext) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cleaning up...");
            if let Ok(guard) = ctx.lock() {
                guard.cleanup();
            }
            std::process::exit(130);
        }
    })
}

/// A scratch directory that is removed when the guard is dropped,
/// whichever way the owning scope exits.
pub struct ScratchDir<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    ctx: SharedCleanupContext,
}

impl<'a, R: Runtime> ScratchDir<'a, R> {
    /// Create a fresh, empty directory at `path`, replacing any leftover from an earlier run.
    #[tracing::instrument(skip(runtime, ctx))]
    pub fn create(runtime: &'a R, path: PathBuf, ctx: SharedCleanupContext) -> Result<Self> {
        if runtime.exists(&path) {
            debug!("Removing stale scratch directory {:?}", path);
            runtime.remove_dir_all(&path)?;
        }
        register(&ctx, &path);
        let scratch = Self { runtime, path, ctx };
        scratch.runtime.create_dir_all(&scratch.path)?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Runtime> Drop for ScratchDir<'_, R> {
    fn drop(&mut self) {
        if self.runtime.exists(&self.path) {
            debug!("Removing scratch directory {:?}", self.path);
            if let Err(e) = self.runtime.remove_dir_all(&self.path) {
                warn!("Failed to remove scratch directory {:?}: {:#}", self.path, e);
            }
        }
        unregister(&self.ctx, &self.path);
    }
}

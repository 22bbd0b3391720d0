//! Environment, directory and host information operations.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn home_dir_impl(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn current_dir_impl(&self) -> Result<PathBuf> {
        env::current_dir().context("Failed to determine the current directory")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn kernel_name_impl(&self) -> Result<String> {
        #[cfg(unix)]
        {
            let uts = nix::sys::utsname::uname().context("Failed to query kernel name")?;
            Ok(uts.sysname().to_string_lossy().into_owned())
        }
        #[cfg(not(unix))]
        {
            Ok(env::consts::OS.to_string())
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn arch_impl(&self) -> String {
        env::consts::ARCH.to_string()
    }
}

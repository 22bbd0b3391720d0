//! Locating and running external tools.

use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn which_impl(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn run_command_impl(
        &self,
        program: &Path,
        args: &[String],
        cwd: &Path,
    ) -> Result<()> {
        let mut command = Command::new(program);
        command.args(args).current_dir(cwd);

        debug!("Spawning {:?} {:?} in {:?}", program, args, cwd);
        let status = command
            .status()
            .with_context(|| format!("Failed to run {}", program.display()))?;

        if !status.success() {
            match status.code() {
                Some(code) => bail!("{} failed with exit code {}", program.display(), code),
                None => bail!("{} was terminated by a signal", program.display()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use std::path::Path;

    #[test]
    #[cfg(unix)]
    fn test_run_command_success_and_failure() {
        let runtime = RealRuntime;

        runtime
            .run_command(Path::new("sh"), &["-c".into(), "exit 0".into()], Path::new("."))
            .unwrap();

        let err = runtime
            .run_command(Path::new("sh"), &["-c".into(), "exit 3".into()], Path::new("."))
            .unwrap_err();
        assert!(err.to_string().contains("exit code 3"));
    }

    #[test]
    #[cfg(unix)]
    fn test_run_command_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        RealRuntime
            .run_command(
                Path::new("sh"),
                &["-c".into(), "touch marker".into()],
                dir.path(),
            )
            .unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn test_run_command_missing_program() {
        let err = RealRuntime
            .run_command(Path::new("sn-libs-no-such-tool"), &[], Path::new("."))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to run"));
    }

    #[test]
    fn test_which_missing_tool() {
        assert!(RealRuntime.which("sn-libs-no-such-tool").is_none());
    }
}

//! Build-side setup: tool checks, vcpkg checkout and `vcpkg install`.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::platform::{BuildTriplet, PlatformId};
use crate::runtime::Runtime;
use crate::ui;

pub const VCPKG_GIT_URL: &str = "https://github.com/microsoft/vcpkg.git";
pub const VCPKG_DIR_NAME: &str = "vcpkg";
pub const VCPKG_INSTALLED_DIR_NAME: &str = "vcpkg_installed";

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Only verify that the build tools are available.
    pub check_only: bool,
    pub triplet: Option<String>,
    /// Existing vcpkg checkout to use instead of `<project>/vcpkg`.
    pub vcpkg_root: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    /// Pass `--debug` to vcpkg.
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    ToolsAvailable,
    Installed {
        triplet: BuildTriplet,
        install_dir: PathBuf,
    },
}

/// Tools that must be on `PATH` to build the libraries on `platform`.
pub fn required_tools(platform: PlatformId) -> Vec<&'static str> {
    let compiler = match platform {
        PlatformId::Linux => "gcc",
        PlatformId::Macos | PlatformId::Windows => "clang",
    };
    vec!["git", "cmake", "ninja", compiler]
}

/// Package manager command that installs every required tool.
pub fn install_hint(platform: PlatformId) -> &'static str {
    match platform {
        PlatformId::Linux => "sudo apt-get install build-essential cmake ninja-build git",
        PlatformId::Macos => "brew install cmake ninja git",
        PlatformId::Windows => "choco install cmake ninja git llvm",
    }
}

pub fn missing_tools<R: Runtime>(runtime: &R, platform: PlatformId) -> Vec<&'static str> {
    required_tools(platform)
        .into_iter()
        .filter(|tool| {
            let found = runtime.which(tool);
            debug!("{} -> {:?}", tool, found);
            found.is_none()
        })
        .collect()
}

#[tracing::instrument(skip(runtime))]
pub fn check_tools<R: Runtime>(runtime: &R, platform: PlatformId) -> Result<()> {
    let missing = missing_tools(runtime, platform);
    if !missing.is_empty() {
        bail!(
            "Missing required tools: {}\n\nPlease install the missing tools:\n  {}",
            missing.join(", "),
            install_hint(platform)
        );
    }
    Ok(())
}

/// Resolve a tool through `PATH`, falling back to the bare name.
fn tool_path<R: Runtime>(runtime: &R, tool: &str) -> PathBuf {
    runtime.which(tool).unwrap_or_else(|| PathBuf::from(tool))
}

fn run<R: Runtime>(runtime: &R, program: &Path, args: Vec<String>, cwd: &Path) -> Result<()> {
    ui::step("Running", format!("{} {}", program.display(), args.join(" ")));
    runtime.run_command(program, &args, cwd)
}

/// Clone or update `<project_root>/vcpkg`, then bootstrap it.
#[tracing::instrument(skip(runtime))]
pub fn setup_vcpkg<R: Runtime>(
    runtime: &R,
    platform: PlatformId,
    project_root: &Path,
) -> Result<PathBuf> {
    let vcpkg_dir = project_root.join(VCPKG_DIR_NAME);
    let git = tool_path(runtime, "git");

    if runtime.exists(&vcpkg_dir) {
        ui::step("Updating", "vcpkg");
        run(runtime, &git, vec!["pull".into()], &vcpkg_dir)?;
    } else {
        ui::step("Cloning", VCPKG_GIT_URL);
        run(
            runtime,
            &git,
            vec![
                "clone".into(),
                VCPKG_GIT_URL.into(),
                vcpkg_dir.display().to_string(),
            ],
            project_root,
        )?;
    }

    match platform {
        PlatformId::Windows => run(
            runtime,
            &vcpkg_dir.join("bootstrap-vcpkg.bat"),
            vec!["-disableMetrics".into()],
            &vcpkg_dir,
        )?,
        PlatformId::Linux | PlatformId::Macos => run(
            runtime,
            Path::new("sh"),
            vec![
                vcpkg_dir.join("bootstrap-vcpkg.sh").display().to_string(),
                "-disableMetrics".into(),
            ],
            &vcpkg_dir,
        )?,
    }

    Ok(vcpkg_dir)
}

pub fn vcpkg_executable(platform: PlatformId, vcpkg_dir: &Path) -> PathBuf {
    match platform {
        PlatformId::Windows => vcpkg_dir.join("vcpkg.exe"),
        PlatformId::Linux | PlatformId::Macos => vcpkg_dir.join("vcpkg"),
    }
}

/// Run `vcpkg install` in manifest mode for `triplet`. Returns the directory
/// the triplet's libraries end up in.
#[tracing::instrument(skip(runtime))]
pub fn install_dependencies<R: Runtime>(
    runtime: &R,
    platform: PlatformId,
    vcpkg_dir: &Path,
    project_root: &Path,
    triplet: &BuildTriplet,
    verbose: bool,
) -> Result<PathBuf> {
    let vcpkg = vcpkg_executable(platform, vcpkg_dir);
    if !runtime.exists(&vcpkg) {
        bail!("vcpkg executable not found at {}", vcpkg.display());
    }

    let installed_root = project_root.join(VCPKG_INSTALLED_DIR_NAME);
    let mut args = vec![
        "install".to_string(),
        format!("--triplet={}", triplet),
        format!("--x-manifest-root={}", project_root.display()),
        format!("--x-install-root={}", installed_root.display()),
    ];
    if verbose {
        args.push("--debug".into());
    }

    ui::step("Installing", format!("dependencies for triplet {}", triplet));
    run(runtime, &vcpkg, args, project_root)?;

    Ok(installed_root.join(triplet.as_str()))
}

#[tracing::instrument(skip(runtime))]
pub fn setup<R: Runtime>(runtime: &R, options: SetupOptions) -> Result<SetupOutcome> {
    let platform = PlatformId::detect(runtime)?;
    let project_root = match options.project_root {
        Some(dir) => dir,
        None => runtime
            .current_dir()
            .context("Failed to determine the working directory")?,
    };

    ui::field("Project root", project_root.display());
    ui::field("Platform", platform);

    check_tools(runtime, platform)?;

    if options.check_only {
        ui::success("All required tools are available.");
        return Ok(SetupOutcome::ToolsAvailable);
    }

    let triplet = match options.triplet {
        Some(triplet) => BuildTriplet::from(triplet),
        None => BuildTriplet::for_host(platform, &runtime.arch()),
    };
    ui::field("Triplet", &triplet);

    let vcpkg_dir = match options.vcpkg_root {
        Some(dir) => {
            if !runtime.exists(&dir) {
                bail!("Specified vcpkg root does not exist: {}", dir.display());
            }
            dir
        }
        None => setup_vcpkg(runtime, platform, &project_root)?,
    };
    info!("Using vcpkg at {:?}", vcpkg_dir);

    let install_dir = install_dependencies(
        runtime,
        platform,
        &vcpkg_dir,
        &project_root,
        &triplet,
        options.verbose,
    )?;

    ui::success(format!(
        "Dependencies installed to {}",
        install_dir.display()
    ));
    Ok(SetupOutcome::Installed {
        triplet,
        install_dir,
    })
}

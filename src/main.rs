use anyhow::Result;
use clap::Parser;
use sn_libs::{
    cache::{DownloadCache, default_cache_root},
    github::DEFAULT_REPO,
    install::{InstallOptions, install},
    platform::{BuildTriplet, PlatformId},
    runtime::{RealRuntime, Runtime},
    setup::{SetupOptions, setup},
    ui,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// sn-libs - prebuilt sindarin libraries
///
/// Installs the latest prebuilt static libraries for this platform into
/// ./libs/<platform>, or builds them locally with vcpkg.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for avoiding API rate limits.
///
/// Examples:
///   sn-libs install            # Install into ./libs/<platform>
///   sn-libs setup --check      # Check that the build tools are available
#[derive(Parser, Debug)]
#[command(author, version = env!("SN_LIBS_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Repository the prebuilt libraries are published from
    #[arg(
        long,
        env = "SN_LIBS_REPO",
        value_name = "OWNER/REPO",
        default_value = DEFAULT_REPO,
        global = true
    )]
    pub repo: String,

    /// Download cache directory (defaults to ~/.sn-cache/downloads)
    #[arg(long = "cache-dir", env = "SN_CACHE_DIR", value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install the latest prebuilt libraries into ./libs/<platform>
    Install(InstallArgs),

    /// Print the detected platform and vcpkg triplet
    Triplet,

    /// Check build tools and build the libraries with vcpkg
    Setup(SetupArgs),

    /// Inspect or clear the download cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Install for another platform instead of the detected one
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<PlatformId>,

    /// Directory that receives the <platform> folder (defaults to ./libs)
    #[arg(long, value_name = "PATH")]
    pub dest: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct SetupArgs {
    /// Only check that the required tools are installed
    #[arg(long)]
    pub check: bool,

    /// Override the vcpkg triplet
    #[arg(long, value_name = "TRIPLET")]
    pub triplet: Option<String>,

    /// Use an existing vcpkg checkout
    #[arg(long = "vcpkg-root", value_name = "PATH")]
    pub vcpkg_root: Option<PathBuf>,

    /// Project containing vcpkg.json (defaults to the current directory)
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum CacheCommands {
    /// List cached archives
    List,

    /// Remove one cached archive, or all of them
    Clear {
        /// File name of the archive to remove
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match dispatch(cli, RealRuntime).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch<R: Runtime + 'static>(cli: Cli, runtime: R) -> Result<()> {
    match cli.command {
        Commands::Install(args) => {
            let options = InstallOptions {
                platform: args.platform,
                repo: cli.repo,
                api_url: cli.api_url,
                cache_dir: cli.cache_dir,
                dest: args.dest,
            };
            install(runtime, options).await?;
        }
        Commands::Triplet => {
            let platform = PlatformId::detect(&runtime)?;
            let triplet = BuildTriplet::for_host(platform, &runtime.arch());
            ui::field("Platform", platform);
            ui::field("Arch", runtime.arch());
            ui::field("Triplet", triplet);
        }
        Commands::Setup(args) => {
            let options = SetupOptions {
                check_only: args.check,
                triplet: args.triplet,
                vcpkg_root: args.vcpkg_root,
                project_root: args.project_root,
                verbose: cli.verbose,
            };
            setup(&runtime, options)?;
        }
        Commands::Cache(command) => {
            let root = match cli.cache_dir {
                Some(dir) => dir,
                None => default_cache_root(&runtime)?,
            };
            let cache = DownloadCache::new(root);
            match command {
                CacheCommands::List => {
                    let entries = cache.list(&runtime)?;
                    if entries.is_empty() {
                        println!("Cache is empty ({}).", cache.root().display());
                    }
                    for entry in entries {
                        println!("{:<48} {:>10}", entry.name, ui::format_size(entry.size));
                    }
                }
                CacheCommands::Clear { name } => {
                    let removed = cache.clear(&runtime, name.as_deref())?;
                    ui::step("Removed", format!("{} cached archive(s)", removed));
                }
            }
        }
    }
    Ok(())
}

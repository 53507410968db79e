use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

/// Runtime module installer.
///
/// Resolves the dependencies declared in ry.deps, folds them into a
/// consistent module set and links a runtime image with a launcher.
///
/// EXAMPLES:
///     rym install                      Install from ./ry.deps
///     rym install --main app/app.Main  Install with a launcher entry point
///     rym clean                        Remove generated output
///     rym wrap --version 0.1.0         Generate the rymw wrapper script
///
/// ENVIRONMENT VARIABLES:
///     RYM_CONFIG_DIR    Directory containing ry.deps
///     RYM_LOCK_DIR      Directory containing ry.deps.lock
///     RYM_CACHE_DIR     Artifact cache directory
///     RYM_OUTPUT_DIR    Output directory
///     RYM_LAUNCHER_DIR  Launcher script directory
///     RYM_RESOLVER      Artifact resolver program
///     RYM_JAVA_HOME     JDK providing jdeps, javac and jlink
///     RYM_JSON          Set to print install reports as JSON
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "rym")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve dependencies and link a runtime image
    ///
    /// Reads ry.deps (or a newer ry.deps.lock), resolves the transitive
    /// artifacts, stages one archive per module and links them with jlink.
    ///
    /// EXAMPLES:
    ///     rym install
    ///     rym install --silent --output-directory build/rym
    #[command(visible_alias = "i")]
    Install {
        /// Directory containing ry.deps
        #[arg(long, env = "RYM_CONFIG_DIR", default_value = ".")]
        config_directory: PathBuf,
        /// Directory containing ry.deps.lock (defaults to the config directory)
        #[arg(long, env = "RYM_LOCK_DIR")]
        lock_directory: Option<PathBuf>,
        /// Artifact cache directory
        #[arg(long, env = "RYM_CACHE_DIR", default_value = ".rym/cache")]
        cache_directory: PathBuf,
        /// Output directory for modules, generated sources and the image
        #[arg(long, env = "RYM_OUTPUT_DIR", default_value = ".rym")]
        output_directory: PathBuf,
        /// Directory receiving the launcher script
        #[arg(long, env = "RYM_LAUNCHER_DIR", default_value = ".")]
        launcher_directory: PathBuf,
        /// Launcher entry point as module[/class]
        #[arg(long)]
        main: Option<String>,
        /// Artifact resolver program
        #[arg(long, env = "RYM_RESOLVER", default_value = rym_package::CommandResolver::DEFAULT_PROGRAM)]
        resolver: PathBuf,
        /// JDK home providing jdeps, javac and jlink
        #[arg(long, env = "RYM_JAVA_HOME")]
        java_home: Option<PathBuf>,
        /// Suppress progress output and the problem summary
        #[arg(long, short = 's')]
        silent: bool,
        /// Print the install report as JSON
        #[arg(long, env = "RYM_JSON")]
        json: bool,
    },

    /// Remove the output directory
    Clean {
        /// Output directory to remove
        #[arg(long, env = "RYM_OUTPUT_DIR", default_value = ".rym")]
        output_directory: PathBuf,
        /// Suppress progress output
        #[arg(long, short = 's')]
        silent: bool,
    },

    /// Generate the rymw wrapper script
    ///
    /// The wrapper downloads a pinned rym release on first use and runs it
    /// with the given arguments.
    #[command(disable_version_flag = true)]
    Wrap {
        /// Repository hosting rym releases
        #[arg(long, default_value = commands::wrap::DEFAULT_REPOSITORY)]
        repository: String,
        /// rym version to pin
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        version: String,
        /// Output directory holding the downloaded release
        #[arg(long, env = "RYM_OUTPUT_DIR", default_value = ".rym")]
        output_directory: PathBuf,
        /// Directory receiving the wrapper script
        #[arg(long, env = "RYM_LAUNCHER_DIR", default_value = ".")]
        launcher_directory: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    match cli.command {
        Commands::Install {
            config_directory,
            lock_directory,
            cache_directory,
            output_directory,
            launcher_directory,
            main,
            resolver,
            java_home,
            silent,
            json,
        } => {
            let args = commands::install::InstallArgs {
                config_dir: config_directory,
                lock_dir: lock_directory,
                cache_dir: cache_directory,
                output_dir: output_directory,
                launcher_dir: launcher_directory,
                main,
                resolver,
                java_home,
                silent,
                json,
                no_color: cli_config.no_color,
            };
            commands::install::run(args)?;
        }
        Commands::Clean {
            output_directory,
            silent,
        } => {
            commands::clean::run(&output_directory, silent)?;
        }
        Commands::Wrap {
            repository,
            version,
            output_directory,
            launcher_directory,
        } => {
            let args = commands::wrap::WrapArgs {
                repository,
                version,
                output_dir: output_directory,
                launcher_dir: launcher_directory,
            };
            commands::wrap::run(&args)?;
        }
    }

    Ok(())
}

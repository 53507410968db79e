//! Install command (rym install)

use anyhow::{Context, Result};
use colored::Colorize;
use rym_build::{InstallConfig, InstallReport, Installer, Jdk, Reporter, Toolchain};
use rym_package::CommandResolver;
use std::path::PathBuf;

/// Arguments for the install command
#[derive(Debug, Clone)]
pub struct InstallArgs {
    pub config_dir: PathBuf,
    pub lock_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub launcher_dir: PathBuf,
    /// Launcher entry point
    pub main: Option<String>,
    /// Artifact resolver program
    pub resolver: PathBuf,
    /// JDK home, falls back to JAVA_HOME then PATH
    pub java_home: Option<PathBuf>,
    pub silent: bool,
    /// Print the report as JSON
    pub json: bool,
    pub no_color: bool,
}

impl InstallArgs {
    fn install_config(&self) -> InstallConfig {
        InstallConfig {
            config_dir: self.config_dir.clone(),
            lock_dir: self.lock_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            output_dir: self.output_dir.clone(),
            launcher_dir: self.launcher_dir.clone(),
            launcher_main: self.main.clone(),
            silent: self.silent,
            ..InstallConfig::default()
        }
    }
}

/// Run the install command
pub fn run(args: InstallArgs) -> Result<()> {
    let mut reporter = Reporter::new(args.silent).with_no_color(args.no_color);

    let java_home = args
        .java_home
        .clone()
        .or_else(|| Jdk::from_env().home().map(PathBuf::from));
    let toolchain = Toolchain::jdk(java_home);
    let resolver = CommandResolver::new(&args.resolver);

    let mut installer = Installer::new(args.install_config(), resolver, toolchain);
    let result = installer.install(&mut reporter);
    reporter.sum_up_problems();

    let report = result.context("install failed")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.silent {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &InstallReport) {
    println!(
        "{} {} modules in {:.2}s",
        "Installed".green().bold(),
        report.staged.len(),
        report.total_time.as_secs_f64()
    );
    println!(
        "  {} artifacts: {} named, {} promoted, {} delegated, {} unnamed",
        report.artifacts, report.named, report.promoted, report.delegated, report.unnamed
    );
    if report.lock_updated {
        println!("  lock file updated");
    }
    println!("  launcher: {}", report.launcher.display());
}

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use sepia::archive::ExtractorBackend;
use sepia::config::{Config, NpmInstaller, default_install_root};
use sepia::engine::Engine;
use sepia::orchestrator::{BatchObserver, Completed, Failure, Operation};
use sepia::runtime::RealRuntime;

/// sepia - editor tooling installer
///
/// Installs and uninstalls packages described by a JSON array of
/// `{"type": ..., "package": {...}}` objects, read from FILE or stdin (`-`).
///
/// Examples:
///   sepia install servers.json
///   cat servers.json | sepia uninstall -
#[derive(Parser, Debug)]
#[command(author, version = env!("SEPIA_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (defaults to <data dir>/sepia)
    #[arg(long = "root", short = 'r', env = "SEPIA_ROOT", value_name = "PATH", global = true)]
    install_root: Option<PathBuf>,

    /// Package manager used for npm packages
    #[arg(
        long,
        env = "SEPIA_NPM_INSTALLER",
        value_enum,
        default_value_t = NpmInstaller::Npm,
        global = true
    )]
    npm_installer: NpmInstaller,

    /// Maximum number of packages processed at once
    #[arg(
        long,
        short = 'j',
        env = "SEPIA_MAX_CONCURRENCY",
        default_value_t = sepia::config::DEFAULT_MAX_CONCURRENCY,
        global = true
    )]
    max_concurrency: NonZeroUsize,

    /// How archives are unpacked
    #[arg(
        long,
        env = "SEPIA_EXTRACTOR",
        value_enum,
        default_value_t = ExtractorBackend::External,
        global = true
    )]
    extractor: ExtractorBackend,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install every package in the descriptor list
    Install(BatchArgs),

    /// Remove every package in the descriptor list
    Uninstall(BatchArgs),
}

#[derive(clap::Args, Debug)]
struct BatchArgs {
    /// JSON file with package descriptors, or `-` for stdin
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// Prints one line per finished package.
struct ConsoleObserver;

impl BatchObserver for ConsoleObserver {
    fn on_success(&self, completed: &Completed) {
        match completed {
            Completed::Installed(report) => {
                println!("Installed {} -> {}", report.name, report.entry_point.display())
            }
            Completed::Uninstalled { name } => println!("Uninstalled {}", name),
        }
    }

    fn on_error(&self, failure: &Failure) {
        eprintln!(
            "Failed to {} {}: {:#}",
            failure.operation,
            failure.display_name(),
            failure.error
        );
    }
}

fn read_descriptors(file: &Path) -> Result<Vec<Value>> {
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read descriptors from stdin")?;
        text
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read descriptors from {:?}", file))?
    };
    serde_json::from_str(&text).context("Descriptors must be a JSON array")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let install_root = match cli.install_root {
        Some(root) => std::path::absolute(&root)
            .with_context(|| format!("Failed to resolve install root {:?}", root))?,
        None => default_install_root(&RealRuntime)?,
    };
    let config = Config {
        npm_installer: cli.npm_installer,
        max_concurrency: cli.max_concurrency,
        extractor: cli.extractor,
        ..Config::new(install_root)
    };

    let (operation, args) = match cli.command {
        Commands::Install(args) => (Operation::Install, args),
        Commands::Uninstall(args) => (Operation::Uninstall, args),
    };
    let items = read_descriptors(&args.file)?;

    let engine = Engine::from_config(config)?;
    let summary = engine.run_all(items, operation, &ConsoleObserver).await;

    if !summary.all_succeeded() {
        bail!(
            "{} of {} package(s) failed to {}",
            summary.failed,
            summary.failed + summary.succeeded,
            operation
        );
    }
    Ok(())
}

//! # husk
//!
//! Content-addressed npm package installer.
//!
//! Parses the command line, installs logging and the panic hook, and hands
//! the command to its handler. Fatal errors are rendered with their help text
//! and cause chain and turn into a non-zero exit code; per-package failures
//! are reported as warnings by the commands themselves.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use husk_core::error::{HuskError, HuskResult};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_DATE"),
    ", ",
    env!("RUSTC_VERSION"),
    ")"
);

/// Content-addressed npm package installer
#[derive(Parser)]
#[command(name = "husk", version, long_version = LONG_VERSION, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Registry base URL
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Cache directory holding the store and config.toml
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the dependencies declared in package.json
    Install(InstallArgs),
    /// Add dependencies to package.json and install
    Add {
        /// Packages as name or name@range
        #[arg(required = true, value_name = "PKG")]
        packages: Vec<String>,
        /// Record under devDependencies
        #[arg(short = 'D', long)]
        dev: bool,
    },
    /// Remove dependencies from package.json and install
    Remove {
        #[arg(required = true, value_name = "PKG")]
        packages: Vec<String>,
    },
    /// Inspect or maintain the package store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Install devDependencies only
    #[arg(long, conflicts_with = "production")]
    pub dev: bool,

    /// Skip devDependencies
    #[arg(long)]
    pub production: bool,

    /// Fail unless husk-lock.json satisfies package.json
    #[arg(long)]
    pub frozen: bool,

    /// Concurrent fetches for resolution and downloads
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// How files are placed into node_modules: hardlink, symlink or copy
    #[arg(long, value_name = "MODE")]
    pub link_mode: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// Show package counts and sizes
    Status,
    /// Drop stale index entries and unreferenced directories
    Prune,
    /// Delete the whole store
    Clear,
    /// Print the store directory
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("husk v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> HuskResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| HuskError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(global_overrides(&cli))?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn global_overrides(cli: &Cli) -> Vec<(String, String)> {
    let mut overrides = Vec::new();
    if let Some(registry) = &cli.registry {
        overrides.push(("registry".to_string(), registry.clone()));
    }
    if let Some(dir) = &cli.cache_dir {
        overrides.push(("cache-dir".to_string(), dir.to_string()));
    }
    overrides
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "error" };
    let crates = [
        "husk_cli",
        "husk_core",
        "husk_config",
        "husk_registry",
        "husk_resolver",
        "husk_cache",
        "husk_dict",
        "husk_lockfile",
    ];
    let default_filter = crates
        .iter()
        .map(|name| format!("{}={}", name, level))
        .collect::<Vec<_>>()
        .join(",");

    // RUST_LOG wins unless --verbose asks for everything
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) if !verbose => filter,
        _ => EnvFilter::new(default_filter),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("husk panicked: {}", panic_info);
        eprintln!("husk crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/husk-dev/husk/issues");
        eprintln!("Error: {}", panic_info);
    }));
}

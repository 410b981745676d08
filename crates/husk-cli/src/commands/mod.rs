//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking the shared `CommandContext`.

use std::collections::HashMap;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use husk_config::{ConfigLoader, HuskConfig};
use husk_core::error::{HuskError, HuskResult};
use tracing::info;

pub mod add;
pub mod install;
pub mod remove;
pub mod store;


use crate::output::OutputHandler;
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    /// Settings given as global flags, keyed like `ConfigLayering` expects
    pub overrides: HashMap<String, String>,
}

impl CommandContext {
    pub fn new(overrides: Vec<(String, String)>) -> HuskResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| HuskError::io("Failed to get current directory".to_string(), e))?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            overrides: overrides.into_iter().collect(),
        })
    }

    pub fn cwd_utf8(&self) -> HuskResult<Utf8PathBuf> {
        Utf8PathBuf::from_path_buf(self.cwd.clone()).map_err(|path| HuskError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("{} is not valid UTF-8", path.display()),
        })
    }

    /// Effective settings with command-specific flags layered on top
    pub async fn load_config(&self, extra: &[(&str, String)]) -> HuskResult<HuskConfig> {
        let mut overrides = self.overrides.clone();
        for (key, value) in extra {
            overrides.insert(key.to_string(), value.clone());
        }
        ConfigLoader::new(self.cwd_utf8()?).load(overrides).await
    }

    /// Directory of the nearest package.json
    pub fn project_dir(&self) -> HuskResult<Utf8PathBuf> {
        let manifest = ConfigLoader::new(self.cwd_utf8()?).resolve_manifest_path();
        if !manifest.is_file() {
            return Err(HuskError::ManifestNotFound {
                path: manifest.to_string(),
            });
        }
        Ok(manifest
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(|| manifest.clone()))
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> HuskResult<()> {
    match command {
        Commands::Install(args) => {
            info!("installing (frozen: {}, dev: {}, production: {})", args.frozen, args.dev, args.production);
            install::execute(args, ctx).await
        },
        Commands::Add { packages, dev } => {
            info!("adding {:?} (dev: {})", packages, dev);
            add::execute(packages, dev, ctx).await
        },
        Commands::Remove { packages } => {
            info!("removing {:?}", packages);
            remove::execute(packages, ctx).await
        },
        Commands::Store { action } => store::execute(action, ctx).await,
    }
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

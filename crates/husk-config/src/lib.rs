//! Configuration parsing for Husk
//!
//! This crate handles the project manifest (`package.json`) and the installer
//! settings (`~/.husk/config.toml`, `HUSK_*` environment variables, CLI flags),
//! providing one resolved `HuskConfig` to the rest of the installer.

pub mod json;
pub mod merge;
pub mod toml;

// Re-export main types
pub use self::json::{DependencySelection, ManifestEditor, PackageJson};
pub use self::merge::{ConfigLayering, ConfigLoader, HuskConfig};
pub use self::toml::ConfigFile;

use husk_core::error::HuskError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, HuskError>;

//! `~/.husk/config.toml` parsing

use camino::Utf8Path;
use husk_core::error::HuskError;
use husk_core::types::LinkMode;
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Settings file. Every field is optional; unset fields keep the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    /// Registry base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Cache root; the store lives in `<cache-dir>/store`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_mode: Option<LinkMode>,

    /// Concurrent tarball pipelines per batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_concurrency: Option<usize>,

    /// Concurrent metadata fetches per resolution batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_concurrency: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,

    /// Retries on transport errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    /// Warn when a later range is not satisfied by the version already chosen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn_on_conflict: Option<bool>,
}

/// Parse config.toml content
pub fn parse_config_file(content: &str) -> ConfigResult<ConfigFile> {
    let config: ConfigFile = toml::from_str(content).map_err(|e| HuskError::TomlParse {
        file: "config.toml".to_string(),
        message: e.to_string(),
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize settings back to TOML
pub fn serialize_config_file(config: &ConfigFile) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| HuskError::TomlParse {
        file: "config.toml".to_string(),
        message: format!("TOML serialization error: {}", e),
    })
}

/// Reject values that parse but make no sense
pub fn validate_config(config: &ConfigFile) -> ConfigResult<()> {
    if let Some(registry) = &config.registry {
        if !(registry.starts_with("http://") || registry.starts_with("https://")) {
            return Err(HuskError::ConfigValidation {
                field: "registry".to_string(),
                reason: format!("'{}' is not an http(s) URL", registry),
            });
        }
    }

    for (field, value) in [
        ("network-concurrency", config.network_concurrency),
        ("resolve-concurrency", config.resolve_concurrency),
    ] {
        if value == Some(0) {
            return Err(HuskError::ConfigValidation {
                field: field.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
    }

    if config.fetch_timeout_secs == Some(0) {
        return Err(HuskError::ConfigValidation {
            field: "fetch-timeout-secs".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Load config.toml from file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<ConfigFile> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| HuskError::io(format!("Failed to read {}", path), e))?;

    parse_config_file(&content).map_err(|e| match e {
        HuskError::TomlParse { message, .. } => HuskError::TomlParse {
            file: path.to_string(),
            message,
        },
        other => other,
    })
}

//! Configuration layering, defaults, and environment overrides
//!
//! Precedence from lowest to highest: built-in defaults, `~/.husk/config.toml`,
//! `HUSK_*` environment variables, CLI flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use husk_core::error::HuskError;
use husk_core::types::LinkMode;

use crate::toml::ConfigFile;
use crate::ConfigResult;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
pub const MANIFEST_FILE: &str = "package.json";

/// Fully resolved installer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuskConfig {
    pub registry: String,
    pub cache_dir: Utf8PathBuf,
    pub link_mode: LinkMode,
    pub network_concurrency: usize,
    pub resolve_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub retries: u32,
    pub warn_on_conflict: bool,
}

impl HuskConfig {
    /// Built-in defaults for a cache rooted at `cache_dir`
    pub fn with_cache_dir(cache_dir: Utf8PathBuf) -> Self {
        let cpus = num_cpus::get().max(1);
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            cache_dir,
            link_mode: LinkMode::default(),
            network_concurrency: (cpus * 2).min(16),
            resolve_concurrency: (cpus * 4).min(32),
            fetch_timeout_secs: 60,
            retries: 2,
            warn_on_conflict: false,
        }
    }

    /// Content-addressable store root
    pub fn store_dir(&self) -> Utf8PathBuf {
        self.cache_dir.join("store")
    }

    /// Store index document
    pub fn index_path(&self) -> Utf8PathBuf {
        self.store_dir().join("index.json")
    }

    /// Registry URL without a trailing slash
    pub fn registry_base(&self) -> &str {
        self.registry.trim_end_matches('/')
    }
}

/// `~/.husk`
pub fn default_cache_dir() -> ConfigResult<Utf8PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| HuskError::ConfigValidation {
        field: "home_dir".to_string(),
        reason: "Could not determine home directory".to_string(),
    })?;

    let home = Utf8PathBuf::try_from(home_dir).map_err(|e| HuskError::ConfigValidation {
        field: "home_dir".to_string(),
        reason: format!("Invalid home directory path: {}", e),
    })?;

    Ok(home.join(".husk"))
}

/// Locates the manifest and the global settings file
pub struct ConfigLoader {
    cwd: Utf8PathBuf,
}

impl ConfigLoader {
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Find `filename` in the working directory or its ancestors.
    ///
    /// Falls back to the path in the working directory when no ancestor has it.
    pub fn resolve_config_path(&self, filename: &str) -> Utf8PathBuf {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let candidate = dir.join(filename);
            if candidate.exists() {
                return candidate;
            }
            current = dir.parent();
        }

        self.cwd.join(filename)
    }

    /// package.json of the enclosing project
    pub fn resolve_manifest_path(&self) -> Utf8PathBuf {
        self.resolve_config_path(MANIFEST_FILE)
    }

    /// Load `<cache_dir>/config.toml` if present
    pub async fn load_global_config(&self, cache_dir: &Utf8Path) -> ConfigResult<Option<ConfigFile>> {
        let path = cache_dir.join("config.toml");
        if path.exists() {
            let config = crate::toml::load_from_file(&path).await?;
            Ok(Some(config))
        } else {
            Ok(None)
        }
    }

    /// Resolve the effective configuration from every layer
    pub async fn load(&self, cli_overrides: HashMap<String, String>) -> ConfigResult<HuskConfig> {
        let env_overrides = ConfigLayering::collect_env_overrides();

        // The cache dir decides where config.toml lives, so settle it first.
        // The home directory is only consulted when neither layer names one.
        let cache_dir = match cli_overrides
            .get("cache-dir")
            .or_else(|| env_overrides.get("HUSK_CACHE_DIR"))
        {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        let file = self.load_global_config(&cache_dir).await?;
        ConfigLayering::merge(cache_dir, file, env_overrides, cli_overrides)
    }
}

/// Layer merging
pub struct ConfigLayering;

impl ConfigLayering {
    /// Merge settings file, environment and CLI layers over the defaults.
    ///
    /// `cache_dir` is the directory the settings file was looked up in; the
    /// file's own `cache-dir` and the higher layers can still move the store.
    pub fn merge(
        cache_dir: Utf8PathBuf,
        file: Option<ConfigFile>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<HuskConfig> {
        let mut config = HuskConfig::with_cache_dir(cache_dir);

        if let Some(file) = file {
            Self::apply_file(&mut config, file);
        }

        Self::apply_env_overrides(&mut config, &env_overrides)?;
        Self::apply_cli_overrides(&mut config, &cli_overrides)?;

        Ok(config)
    }

    fn apply_file(config: &mut HuskConfig, file: ConfigFile) {
        if let Some(dir) = file.cache_dir {
            config.cache_dir = Utf8PathBuf::from(dir);
        }
        if let Some(registry) = file.registry {
            config.registry = registry;
        }
        if let Some(mode) = file.link_mode {
            config.link_mode = mode;
        }
        if let Some(n) = file.network_concurrency {
            config.network_concurrency = n;
        }
        if let Some(n) = file.resolve_concurrency {
            config.resolve_concurrency = n;
        }
        if let Some(secs) = file.fetch_timeout_secs {
            config.fetch_timeout_secs = secs;
        }
        if let Some(retries) = file.retries {
            config.retries = retries;
        }
        if let Some(warn) = file.warn_on_conflict {
            config.warn_on_conflict = warn;
        }
    }

    fn apply_env_overrides(
        config: &mut HuskConfig,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "HUSK_REGISTRY" => config.registry = value.clone(),
                "HUSK_CACHE_DIR" => config.cache_dir = Utf8PathBuf::from(value),
                "HUSK_LINK_MODE" => config.link_mode = parse_link_mode(key, value)?,
                "HUSK_PARALLEL" => {
                    let n = parse_parallel(key, value)?;
                    config.network_concurrency = n;
                    config.resolve_concurrency = n;
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    fn apply_cli_overrides(
        config: &mut HuskConfig,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "registry" => config.registry = value.clone(),
                "cache-dir" => config.cache_dir = Utf8PathBuf::from(value),
                "link-mode" => config.link_mode = parse_link_mode("--link-mode", value)?,
                "parallel" => {
                    let n = parse_parallel("--parallel", value)?;
                    config.network_concurrency = n;
                    config.resolve_concurrency = n;
                },
                _ => {},
            }
        }

        Ok(())
    }

    /// Collect `HUSK_*` environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("HUSK_"))
            .collect()
    }
}

fn parse_link_mode(field: &str, value: &str) -> ConfigResult<LinkMode> {
    value.parse().map_err(|reason| HuskError::ConfigValidation {
        field: field.to_string(),
        reason,
    })
}

fn parse_parallel(field: &str, value: &str) -> ConfigResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(HuskError::ConfigValidation {
            field: field.to_string(),
            reason: format!("expected a positive integer, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_with_cache(dir: &str) -> ConfigFile {
        ConfigFile {
            cache_dir: Some(dir.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = HuskConfig::with_cache_dir(Utf8PathBuf::from("/tmp/husk"));
        assert_eq!(config.registry, DEFAULT_REGISTRY);
        assert_eq!(config.link_mode, LinkMode::Hardlink);
        assert!(config.network_concurrency >= 1 && config.network_concurrency <= 16);
        assert!(config.resolve_concurrency >= 1 && config.resolve_concurrency <= 32);
        assert_eq!(config.store_dir(), Utf8PathBuf::from("/tmp/husk/store"));
        assert_eq!(
            config.index_path(),
            Utf8PathBuf::from("/tmp/husk/store/index.json")
        );
        assert!(!config.warn_on_conflict);
    }

    #[test]
    fn test_merge_precedence() {
        let file = ConfigFile {
            registry: Some("https://file.example".to_string()),
            link_mode: Some(LinkMode::Symlink),
            retries: Some(7),
            ..file_with_cache("/cache")
        };
        let env = HashMap::from([
            ("HUSK_REGISTRY".to_string(), "https://env.example/".to_string()),
            ("HUSK_PARALLEL".to_string(), "3".to_string()),
            ("HUSK_UNRELATED".to_string(), "x".to_string()),
        ]);
        let cli = HashMap::from([("link-mode".to_string(), "copy".to_string())]);

        let merged = ConfigLayering::merge(Utf8PathBuf::from("/base"), Some(file), env, cli).unwrap();

        assert_eq!(merged.registry, "https://env.example/");
        assert_eq!(merged.registry_base(), "https://env.example");
        assert_eq!(merged.link_mode, LinkMode::Copy);
        assert_eq!(merged.network_concurrency, 3);
        assert_eq!(merged.resolve_concurrency, 3);
        assert_eq!(merged.retries, 7);
        assert_eq!(merged.cache_dir, Utf8PathBuf::from("/cache"));
    }

    #[test]
    fn test_cache_dir_layers() {
        let base = || Utf8PathBuf::from("/base");
        let env = || HashMap::from([("HUSK_CACHE_DIR".to_string(), "/env".to_string())]);
        let cli = || HashMap::from([("cache-dir".to_string(), "/cli".to_string())]);

        let merged = ConfigLayering::merge(base(), None, HashMap::new(), HashMap::new()).unwrap();
        assert_eq!(merged.cache_dir, Utf8PathBuf::from("/base"));

        let merged = ConfigLayering::merge(base(), Some(file_with_cache("/file")), HashMap::new(), HashMap::new()).unwrap();
        assert_eq!(merged.store_dir(), Utf8PathBuf::from("/file/store"));

        let merged = ConfigLayering::merge(base(), Some(file_with_cache("/file")), env(), HashMap::new()).unwrap();
        assert_eq!(merged.cache_dir, Utf8PathBuf::from("/env"));

        let merged = ConfigLayering::merge(base(), Some(file_with_cache("/file")), env(), cli()).unwrap();
        assert_eq!(merged.cache_dir, Utf8PathBuf::from("/cli"));
    }

    #[test]
    fn test_invalid_overrides() {
        let env = HashMap::from([("HUSK_LINK_MODE".to_string(), "teleport".to_string())]);
        let err = ConfigLayering::merge(Utf8PathBuf::from("/base"), Some(file_with_cache("/c")), env, HashMap::new())
            .unwrap_err();
        assert!(matches!(err, HuskError::ConfigValidation { .. }));

        let cli = HashMap::from([("parallel".to_string(), "0".to_string())]);
        let err = ConfigLayering::merge(Utf8PathBuf::from("/base"), Some(file_with_cache("/c")), HashMap::new(), cli)
            .unwrap_err();
        assert!(matches!(err, HuskError::ConfigValidation { ref field, .. } if field == "--parallel"));
    }

    #[test]
    fn test_resolve_manifest_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        std::fs::write(root.join("package.json"), "{}").unwrap();
        let nested = root.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let loader = ConfigLoader::new(nested);
        assert_eq!(loader.resolve_manifest_path(), root.join("package.json"));
    }

    #[test]
    fn test_resolve_missing_falls_back_to_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let loader = ConfigLoader::new(root.clone());
        let resolved = loader.resolve_config_path("husk-missing-file.json");
        assert_eq!(resolved, root.join("husk-missing-file.json"));
    }

    #[tokio::test]
    async fn test_load_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let loader = ConfigLoader::new(cache.clone());

        assert!(loader.load_global_config(&cache).await.unwrap().is_none());

        tokio::fs::write(cache.join("config.toml"), "retries = 4\n")
            .await
            .unwrap();
        let file = loader.load_global_config(&cache).await.unwrap().unwrap();
        assert_eq!(file.retries, Some(4));
    }

    #[tokio::test]
    async fn test_load_uses_cli_cache_dir() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        tokio::fs::write(cache.join("config.toml"), "warn-on-conflict = true\n")
            .await
            .unwrap();

        let loader = ConfigLoader::new(cache.clone());
        let cli = HashMap::from([("cache-dir".to_string(), cache.to_string())]);
        let config = loader.load(cli).await.unwrap();

        assert_eq!(config.cache_dir, cache);
        assert!(config.warn_on_conflict);
    }

    #[tokio::test]
    async fn test_load_honors_cache_dir_from_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let settings = root.join("settings");
        std::fs::create_dir_all(&settings).unwrap();
        let store_home = root.join("elsewhere");
        tokio::fs::write(
            settings.join("config.toml"),
            format!("cache-dir = \"{}\"\n", store_home.as_str().replace('\\', "/")),
        )
        .await
        .unwrap();

        let loader = ConfigLoader::new(root.clone());
        let cli = HashMap::from([("cache-dir".to_string(), settings.to_string())]);
        let config = loader.load(cli).await.unwrap();

        // The flag picks where config.toml is read from and still wins over it
        assert_eq!(config.cache_dir, settings);

        let file = loader.load_global_config(&settings).await.unwrap().unwrap();
        let merged = ConfigLayering::merge(settings.clone(), Some(file), HashMap::new(), HashMap::new()).unwrap();
        assert_eq!(merged.cache_dir.as_str().replace('\\', "/"), store_home.as_str().replace('\\', "/"));
    }
}

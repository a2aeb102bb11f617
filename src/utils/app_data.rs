use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "srcx";
const CONFIG_FILE: &str = "config.json";

/// Engine configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows per page when the caller does not ask for a limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound applied to caller-supplied limits
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Number of promoted path rows shown above single-term results
    #[serde(default = "default_promote_limit")]
    pub promote_limit: usize,

    /// Probe direct searchers concurrently instead of one at a time
    #[serde(default)]
    pub parallel_direct_search: bool,

    /// Plugins whose filters are available to queries
    #[serde(default = "default_enabled_plugins")]
    pub enabled_plugins: Vec<String>,

    /// Number of distinct plugin sets whose grammars are kept
    #[serde(default = "default_catalog_cache_size")]
    pub catalog_cache_size: usize,
}

fn default_limit() -> usize {
    100
}

fn default_max_limit() -> usize {
    1000
}

fn default_promote_limit() -> usize {
    5
}

fn default_enabled_plugins() -> Vec<String> {
    ["core", "clang", "js"].iter().map(|s| s.to_string()).collect()
}

fn default_catalog_cache_size() -> usize {
    32
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            promote_limit: default_promote_limit(),
            parallel_direct_search: false,
            enabled_plugins: default_enabled_plugins(),
            catalog_cache_size: default_catalog_cache_size(),
        }
    }
}

impl EngineConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load config from an explicit file, or return default if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .context("Failed to read config file")?;
            let config: EngineConfig = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Resolve a requested page size: default when absent, capped at `max_limit`
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

use blocklite_storage::Options;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for blocklite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Blockstore file; defaults to `blocks.db` in the platform data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub store: Options,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            log_filter: default_log_filter(),
            store: Options::default(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "blocklite", "blocklite")
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_or_create(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if it is missing
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Load config from an explicit file, which must exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = project_dirs() {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.blocklite/config.toml")
        }
    }

    /// Resolve the blockstore path, creating its parent directory
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        let path = match &self.database {
            Some(path) => path.clone(),
            None => match project_dirs() {
                Some(dirs) => dirs.data_dir().join("blocks.db"),
                None => PathBuf::from("blocks.db"),
            },
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

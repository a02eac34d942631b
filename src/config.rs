// ⚙️ Configuration - defaults → TOML file → QUOTE_SYNC_* environment

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "quote-sync";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Install the default quotes the first time the store is opened
    #[serde(default = "default_true")]
    pub seed_defaults: bool,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    /// Category given to remote records that carry none
    pub default_category: String,
    /// Take at most this many records per fetch
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            seed_defaults: true,
            remote: RemoteConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            enabled: true,
            url: "https://jsonplaceholder.typicode.com/posts".to_string(),
            timeout_seconds: 10,
            poll_interval_seconds: 30,
            default_category: "Server".to_string(),
            limit: Some(5),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

/// `<data dir>/quote-sync/quotes.db`, falling back to the working directory
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("quotes.db")
}

/// `$XDG_CONFIG_HOME/quote-sync/config.toml` or the platform config dir
pub fn default_config_path() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config).join(APP_DIR).join("config.toml");
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        ConfigManager {
            config_path: default_config_path(),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        ConfigManager { config_path: path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<AppConfig> {
        self.figment()
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", self.config_path.display()))
    }

    fn figment(&self) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment.merge(Env::prefixed("QUOTE_SYNC_").split("__"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

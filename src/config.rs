use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured service URL
pub const API_URL_ENV: &str = "DOCCHAT_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the document Q&A service, including the `/api` prefix
    pub api_base_url: String,

    /// Transport timeout applied to every request
    pub request_timeout_secs: u64,

    /// Client home directory (config file, stored credential)
    #[serde(skip)]
    pub docchat_home: PathBuf,

    /// Output preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Print citations under each answer
    pub show_sources: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { show_sources: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 60,
            docchat_home: home.join(".docchat"),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.docchat/config.toml`, then apply the environment
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let mut config = Self::load_from(&home.join(".docchat"))?;
        config.apply_api_url_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load configuration rooted at an explicit home directory
    pub fn load_from(docchat_home: &Path) -> Result<Self> {
        let config_path = docchat_home.join("config.toml");

        fs::create_dir_all(docchat_home).context("Failed to create .docchat directory")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.docchat_home = docchat_home.to_path_buf();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.docchat_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Replace the service URL when an override is present and non-empty
    pub fn apply_api_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub suggest: SuggestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Base URL of the server the `suggest` command talks to
    pub server_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for SuggestConfig {
    fn default() -> Self {
        SuggestConfig {
            server_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SuggestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from $UNCONF_CONFIG or ~/.unconf/config.toml, writing the
    /// defaults there on first use
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(config_path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let content_with_header = format!(
            "# Unconf Configuration\n\
             # Upstream AI credentials are read from the environment:\n\
             # AZURE_API_KEY, AZURE_ENDPOINT, API_VERSION, DEPLOYMENT_NAME\n\
             \n{}",
            content
        );

        fs::write(config_path, content_with_header)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        eprintln!("Created config file at: {}", config_path.display());

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("UNCONF_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let home = std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .context("Neither USERPROFILE nor HOME environment variable is set")?;

        Ok(PathBuf::from(home).join(".unconf").join("config.toml"))
    }
}

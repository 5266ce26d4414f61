// ABOUTME: Console configuration loaded from a TOML file
// ABOUTME: Holds the API base URL and the polling cadence

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_api_base_url() -> String {
    "https://api.authbrasil.app.br/api/v1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join("cnpj-etl-console").join("config.toml"),
        None => PathBuf::from(".cnpj-etl-console").join("config.toml"),
    }
}

impl ConsoleConfig {
    /// Loads the config file, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ConsoleConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.api_base_url, default_api_base_url());
        assert_eq!(config.poll_interval(), Duration::from_millis(5000));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: ConsoleConfig =
            toml::from_str(r#"api_base_url = "http://localhost:8000/api/v1""#).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.poll_interval_ms, 5000);
    }
}

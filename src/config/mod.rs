use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recognition: RecognitionConfig,
    pub analysis: AnalysisConfig,
    pub behavior: BehaviorConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Recognizer backend: "command" spawns `command` and reads
    /// line-delimited JSON events from its stdout; "none" disables
    /// voice capture (recording controls degrade gracefully).
    pub provider: String,
    /// Shell command for the "command" provider.
    pub command: Option<String>,
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            provider: "command".to_string(),
            command: None,
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis provider: "keyword" (built-in heuristics) or "openai-api".
    pub provider: String,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: "keyword".to_string(),
            api_key: None,
            api_endpoint: None,
            model: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Directory for transcript downloads. Defaults to the data dir's
    /// exports/ folder when unset.
    pub export_dir: Option<PathBuf>,
    /// Maximum meetings returned by list endpoints.
    pub history_limit: usize,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            export_dir: None,
            history_limit: 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3839 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

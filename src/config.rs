use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::spotify::{MAX_FEATURE_IDS, MAX_SAVED_PAGE};
use crate::cycles::CycleFilter;
use crate::pipeline::PipelineConfig;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("page_size must be between 1 and 50, got {0}")]
    PageSize(usize),
    #[error("feature_batch_size must be between 1 and 100, got {0}")]
    FeatureBatchSize(usize),
    #[error("rolling_window must be at least 1")]
    RollingWindow,
}

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub cycles: CycleFilter,
    pub catalog: CatalogConfig,
}

/// Catalog Web API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub api_base: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/moodswing/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Check values against the catalog's per-call limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if p.page_size == 0 || p.page_size > MAX_SAVED_PAGE {
            return Err(ConfigError::PageSize(p.page_size));
        }
        if p.feature_batch_size == 0 || p.feature_batch_size > MAX_FEATURE_IDS {
            return Err(ConfigError::FeatureBatchSize(p.feature_batch_size));
        }
        if p.rolling_window == 0 {
            return Err(ConfigError::RollingWindow);
        }
        Ok(())
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

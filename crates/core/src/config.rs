//! Configuration management for Dactylos.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults in [`Config::default_config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Text shown by the platform verification dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_message")]
    pub message: String,
    #[serde(default = "default_cancel_label")]
    pub cancel_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: Option<PathBuf>,
}

fn default_prompt_message() -> String {
    "Verify your identity".to_string()
}

fn default_cancel_label() -> String {
    "Cancel".to_string()
}

fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_store_path() -> Option<PathBuf> {
    Some(PathBuf::from("dactylos.db"))
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            message: default_prompt_message(),
            cancel_label: default_cancel_label(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        debug!(
            backend = ?config.store.backend,
            path = ?config.store.path,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            prompt: PromptConfig::default(),
            store: StoreConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.message.trim().is_empty() {
            warn!("Rejecting configuration with a blank prompt message");
            return Err(CoreError::Config(
                "prompt.message must not be empty".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            warn!("Rejecting sqlite store configuration without a path");
            return Err(CoreError::Config(
                "store.path is required for the sqlite backend".to_string(),
            ));
        }
        Ok(())
    }
}

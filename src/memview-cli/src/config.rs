//! Configuration management for memview CLI

use anyhow::{Context, Result};
use memview::{CacheConfig, Codec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::parse::parse_address;

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub codec: Option<Codec>,
    /// Kept as text: TOML integers cannot hold every 64-bit address
    pub base_address: Option<String>,
    pub cache: CacheConfig,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("memview");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Default base address, if one is configured
    pub fn get_base_address(&self) -> Result<Option<u64>> {
        self.base_address
            .as_deref()
            .map(parse_address)
            .transpose()
            .context("Invalid base_address in config")
    }

    pub fn set_base_address(&mut self, base: u64) {
        self.base_address = Some(format!("{:#x}", base));
    }

    pub fn get_codec(&self) -> Codec {
        self.codec.unwrap_or_default()
    }
}

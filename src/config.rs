//! Configuration management for cacao-caldera.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::convert::ConvertSettings;

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".cacao-caldera.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output settings
    pub output: OutputConfig,

    /// Playbook lookup settings
    pub playbooks: PlaybookConfig,

    /// Caldera ability settings
    pub caldera: CalderaConfig,
}

/// Where and what to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the generated `data/` tree
    pub dir: PathBuf,

    /// Whether to write a conversion manifest per playbook
    pub write_manifest: bool,
}

/// Playbook lookup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookConfig {
    /// Directory sub-playbook references are resolved against
    pub dir: PathBuf,
}

/// Settings applied to generated abilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalderaConfig {
    /// Module tag of generated requirements
    pub requirement_module: String,

    /// Module tag of generated parsers
    pub parser_module: String,

    /// Executor timeout in seconds for steps that declare none
    pub default_timeout: u64,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.cacao-caldera.toml` in current directory
    /// 2. `~/.config/cacao-caldera/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Could not read config {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cacao-caldera"))
    }

    /// Conversion settings derived from this configuration.
    pub fn convert_settings(&self) -> ConvertSettings {
        ConvertSettings {
            requirement_module: self.caldera.requirement_module.clone(),
            parser_module: self.caldera.parser_module.clone(),
            default_timeout: self.caldera.default_timeout,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("."), write_manifest: true }
    }
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("playbooks") }
    }
}

impl Default for CalderaConfig {
    fn default() -> Self {
        let settings = ConvertSettings::default();
        Self {
            requirement_module: settings.requirement_module,
            parser_module: settings.parser_module,
            default_timeout: settings.default_timeout,
        }
    }
}

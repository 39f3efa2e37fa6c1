//! Configuration file support for the jam CLI
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/jam/config.toml`
//! - macOS: `~/Library/Application Support/jam/config.toml`
//! - Windows: `%APPDATA%\jam\config.toml`

use crate::error::{ConfigError, Result};
use directories::ProjectDirs;
use jam_core::BridgeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings for the bridge the CLI drives
    pub bridge: BridgeConfig,
    /// Helper module settings
    pub modules: ModuleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
    /// Append the bundled standard library to the search path
    pub stdlib: bool,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self { stdlib: true }
    }
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if not found. Parse errors
    /// are logged.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) | Err(ConfigError::NoConfigDir) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "jam")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        write_default_config(&path)?;
        Ok(path)
    }
}

const DEFAULT_CONFIG: &str = r#"# jam configuration file

[bridge]
# Prefix of console lines
name = "jam"

# Clock resolution and tempo at startup (overridden by --tpb / --bpm)
ticks_per_beat = 180.0
beats_per_minute = 100.0

# Interpreter limits per handler call
max_operations = 500000
max_call_levels = 64
max_expr_depth = 256

# Directories searched by `import`, after the script's own directory
# and its lib/ subdirectory
search_path = [".", "./lib"]

[modules]
# Make the bundled helpers (arp, euclid, scales) importable
stdlib = true
"#;

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}

//! Bootstrap configuration loading
//!
//! Configuration is resolved once at startup in this priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`HAPTICS_CONFIG`, `HAPTICS_ASSET_ROOT`)
//! 3. TOML config file (explicit path, else the platform config directory)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: a warning is logged and defaults
//! are used. A config file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "HAPTICS_CONFIG";

/// Environment variable naming the asset root directory
pub const ASSET_ROOT_ENV_VAR: &str = "HAPTICS_ASSET_ROOT";

/// Engine configuration loaded from TOML
///
/// Every field has a built-in default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory that logical asset paths are resolved against
    pub asset_root: PathBuf,

    /// Duration of the fixed coarse pulse used when fine control is missing
    ///
    /// Default: 200ms
    pub coarse_pulse_ms: u64,

    /// Capacity of the engine notification channel
    ///
    /// Default: 100
    pub event_capacity: usize,

    /// Whether the simulated backend fires completion callbacks on its own
    ///
    /// Default: true
    pub simulated_completion: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            coarse_pulse_ms: 200,
            event_capacity: 100,
            simulated_completion: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.coarse_pulse_ms == 0 {
            return Err(Error::Config(
                "coarse_pulse_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Coarse pulse length as a Duration
    pub fn coarse_pulse(&self) -> Duration {
        Duration::from_millis(self.coarse_pulse_ms)
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Resolves the effective configuration from all sources
pub struct ConfigResolver {
    overrides: ConfigOverrides,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self { overrides }
    }

    /// Resolve the effective configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a config file exists but is malformed or
    /// holds invalid values.
    pub fn resolve(&self) -> Result<EngineConfig> {
        let mut config = match self.config_file_path() {
            Some(path) if path.exists() => EngineConfig::load_file(&path)?,
            Some(path) => {
                warn!("Config file {:?} not found, using defaults", path);
                EngineConfig::default()
            }
            None => {
                warn!("No config directory available, using defaults");
                EngineConfig::default()
            }
        };

        // Asset root: CLI > env > TOML > default
        if let Some(root) = &self.overrides.asset_root {
            info!("Asset root: {:?} (from CLI override)", root);
            config.asset_root = root.clone();
        } else if let Ok(root) = std::env::var(ASSET_ROOT_ENV_VAR) {
            info!("Asset root: {} (from {})", root, ASSET_ROOT_ENV_VAR);
            config.asset_root = PathBuf::from(root);
        }

        if let Some(level) = &self.overrides.log_level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }

    /// Config file to read: CLI > env > platform default
    fn config_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.overrides.config_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        default_config_path()
    }
}

/// Platform default config file location
///
/// `<config_dir>/haptics/config.toml`, e.g. `~/.config/haptics/config.toml`
/// on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("haptics").join("config.toml"))
}

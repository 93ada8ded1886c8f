//! Configuration file loading
//!
//! Loads user configuration from `~/.config/shutter/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ShutterConfig;
use crate::error::{Result, ShutterError};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Capture settings
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// Diagnostic logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Emit diagnostics for rejected and failed captures
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Capture orchestration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Reject overlapping capture requests
    #[serde(default = "default_true")]
    pub single_flight: bool,

    /// Provider timeout in milliseconds (0 = no timeout)
    #[serde(default)]
    pub timeout_ms: u64,

    /// Directory for captures without an explicit destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            single_flight: true,
            timeout_ms: 0,
            output_dir: None,
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("shutter").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("shutter")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/shutter/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ShutterError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| ShutterError::config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ShutterError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ShutterError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| ShutterError::config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Convert into runtime options
    pub fn into_config(self) -> ShutterConfig {
        ShutterConfig {
            logging: self.logging.enabled,
            single_flight: self.capture.single_flight,
            capture_timeout: match self.capture.timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            output_dir: self.capture.output_dir,
        }
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Shutter Configuration

[logging]
# Log rejected captures and provider failures
enabled = true

[capture]
# Reject a new capture while another one is still running
single_flight = true

# Give up on a capture after this many milliseconds (0 = wait forever)
timeout_ms = 0

# Directory for captures without an explicit destination
# (defaults to ~/Pictures/Screenshots)
# output_dir = "/home/me/Pictures/Screenshots"
"#
    .to_string()
}

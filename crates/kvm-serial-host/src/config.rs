//! TOML configuration for the host application.
//!
//! Every field has a sensible default, so an empty file (or a missing one)
//! yields a working configuration except for the serial port, which has no
//! safe default and must be set explicitly.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use kvm_serial_core::Layout;

use crate::capture::BackendKind;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("mouse screen dimensions must be non-zero, got {width}x{height}")]
    InvalidScreenSize { width: u32, height: u32 },
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub keyboard: KeyboardConfig,
    pub mouse: MouseConfig,
}

/// `[serial]` section: the link to the CH9329 chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`. Required.
    pub port: Option<String>,
    /// Baud rate. The CH9329 ships configured for 9600.
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { port: None, baud: 9600 }
    }
}

/// `[keyboard]` section: which capture backend to run and with what layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub backend: BackendKind,
    pub layout: Layout,
}

/// `[mouse]` section: the optional pointer capture thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    pub enabled: bool,
    /// Local screen size, used to scale cursor positions into the
    /// 0..4096 coordinate space the CH9329 expects.
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `path`. A missing file is not an
    /// error; defaults are used instead.
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints TOML cannot express. The mouse scaler divides
    /// by the screen dimensions, so a zero dimension must be caught here
    /// rather than mid-session on the first pointer move.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mouse.screen_width == 0 || self.mouse.screen_height == 0 {
            return Err(ConfigError::InvalidScreenSize {
                width: self.mouse.screen_width,
                height: self.mouse.screen_height,
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

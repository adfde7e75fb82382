//! Runtime configuration
//!
//! ```toml
//! [limits]
//! max_cartridge_bytes = 1048576
//! max_cycle_budget = 100000
//! cycles_per_frame = 256
//!
//! [display]
//! mode = "auto"      # auto | ratatui | headless
//! frame_ms = 120
//! ```

use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::interpreter::DEFAULT_MAX_CYCLE_BUDGET;
use crate::marker::DEFAULT_MAX_CARTRIDGE_BYTES;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "PIXELCART_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cycles_per_frame must be between 1 and max_cycle_budget ({0})")]
    BadBudget(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Cumulative ceiling on cartridge bytes extracted from one file
    pub max_cartridge_bytes: usize,
    /// No run may use more cycles than this
    pub max_cycle_budget: u32,
    /// Budget handed to every frame
    pub cycles_per_frame: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_cartridge_bytes: DEFAULT_MAX_CARTRIDGE_BYTES,
            max_cycle_budget: DEFAULT_MAX_CYCLE_BUDGET,
            cycles_per_frame: 256,
        }
    }
}

/// Display mode selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Ratatui when attached to a terminal, headless otherwise
    #[default]
    Auto,
    Ratatui,
    /// No display output (for testing/CI)
    Headless,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    /// Fixed time step between frames
    pub frame_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            mode: DisplayMode::Auto,
            frame_ms: 120,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub display: DisplayConfig,
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&text, path)
    }

    /// Explicit path, then `PIXELCART_CONFIG`, then defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Config::from_file(&path)
            }
            None => Ok(Config::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.limits;
        if l.cycles_per_frame == 0 || l.cycles_per_frame > l.max_cycle_budget {
            return Err(ConfigError::BadBudget(l.max_cycle_budget));
        }
        Ok(())
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loader configuration.
//!
//! Supports both programmatic and file-based configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where descriptions and modules are looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directory scanned by `load_all` and searched for `using` references.
    #[serde(default = "default_descriptions_dir")]
    pub descriptions_dir: PathBuf,

    /// Description file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Directories tried before the system library path.
    #[serde(default)]
    pub library_dirs: Vec<PathBuf>,

    /// Description units loaded before anything else.
    #[serde(default)]
    pub preload: Vec<String>,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_descriptions_dir() -> PathBuf {
    PathBuf::from("/usr/share/dynbind/descriptions")
}

fn default_extension() -> String {
    "ender".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            descriptions_dir: default_descriptions_dir(),
            extension: default_extension(),
            library_dirs: Vec::new(),
            preload: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl LoaderConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration rooted at a descriptions directory.
    pub fn with_descriptions_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            descriptions_dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.is_empty() {
            return Err(ConfigError::Invalid("Empty description extension".into()));
        }
        if self.extension.starts_with('.') || self.extension.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "Extension '{}' must be a bare suffix",
                self.extension
            )));
        }
        if let Some(unit) = self.preload.iter().find(|u| u.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "Empty preload entry '{}'",
                unit
            )));
        }
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
            other => Err(ConfigError::Invalid(format!("Unknown log level '{}'", other))),
        }
    }
}

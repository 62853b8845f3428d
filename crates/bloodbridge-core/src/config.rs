//! Application configuration management.
//!
//! This module loads the application configuration: where snapshots live,
//! whether to write them at all, and an optional log file for front ends.
//! The file is edited by hand; a missing file means defaults.
//!
//! Configuration is stored at `~/.config/blood-bridge/config.json`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::PersistError;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "blood-bridge";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the snapshot directory.
pub const DATA_DIR_ENV: &str = "BLOODBRIDGE_DATA_DIR";

/// Overrides the log file.
pub const LOG_FILE_ENV: &str = "BLOODBRIDGE_LOG_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_file: None,
            persist: default_persist(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var_os(DATA_DIR_ENV).map(PathBuf::from),
            std::env::var_os(LOG_FILE_ENV).map(PathBuf::from),
        );
    }

    fn apply_overrides(&mut self, data_dir: Option<PathBuf>, log_file: Option<PathBuf>) {
        if let Some(dir) = data_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.data_dir = Some(dir);
        }
        if let Some(file) = log_file.filter(|f| !f.as_os_str().is_empty()) {
            self.log_file = Some(file);
        }
    }

    /// Directory holding the snapshot file.
    pub fn data_dir(&self) -> Result<PathBuf, PersistError> {
        resolve_data_dir(self.data_dir.as_deref(), dirs::data_dir())
    }
}

/// An explicit directory wins; otherwise the app folder under the platform
/// data directory.
fn resolve_data_dir(
    explicit: Option<&Path>,
    platform: Option<PathBuf>,
) -> Result<PathBuf, PersistError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    platform
        .map(|dir| dir.join(APP_NAME))
        .ok_or(PersistError::NoDataDir)
}

//! Unified path management for crm-agent files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/crm-agent/         # Config directory
//! ├── config.toml              # Application configuration
//! ├── sessions/                # Chat sessions (one JSON file each)
//! └── workflows/               # Workflow definitions (one TOML file each)
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "crm-agent";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct CrmPaths;

impl CrmPaths {
    /// Returns the crm-agent configuration directory (e.g. `~/.config/crm-agent/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("sessions"))
    }

    /// Default workflow directory, used when the config names none.
    pub fn workflows_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("workflows"))
    }
}

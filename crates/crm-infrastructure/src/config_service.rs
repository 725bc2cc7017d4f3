//! Configuration service.
//!
//! Loads [`AppConfig`] from `~/.config/crm-agent/config.toml` (or an explicit
//! path), applies environment overrides and caches the result.

use crate::paths::CrmPaths;
use crate::storage::AtomicTomlFile;
use crm_core::config::AppConfig;
use crm_core::error::{CrmError, Result};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Overrides `oracle.endpoint`.
pub const ENV_ORACLE_ENDPOINT: &str = "CRM_ORACLE_ENDPOINT";
/// Overrides `oracle.api_key`.
pub const ENV_ORACLE_API_KEY: &str = "CRM_ORACLE_API_KEY";

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    /// Service reading the default config file location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service reading an explicit file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration, loading it on first access.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn get_config(&self) -> Result<AppConfig> {
        if let Some(cached) = self.read_cache()? {
            return Ok(cached);
        }

        let mut loaded = self.load_file()?;
        apply_overrides(&mut loaded, |key| std::env::var(key).ok());

        let mut cache = self
            .config
            .write()
            .map_err(|_| CrmError::internal("config cache poisoned"))?;
        *cache = Some(loaded.clone());
        Ok(loaded)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) -> Result<()> {
        let mut cache = self
            .config
            .write()
            .map_err(|_| CrmError::internal("config cache poisoned"))?;
        *cache = None;
        Ok(())
    }

    /// Writes a configuration (without env overrides) and refreshes the cache.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        AtomicTomlFile::<AppConfig>::new(self.config_path()?).save_locked(config)?;
        self.invalidate_cache()
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => CrmPaths::config_file().map_err(|e| CrmError::config(e.to_string())),
        }
    }

    fn read_cache(&self) -> Result<Option<AppConfig>> {
        let cache = self
            .config
            .read()
            .map_err(|_| CrmError::internal("config cache poisoned"))?;
        Ok(cache.clone())
    }

    fn load_file(&self) -> Result<AppConfig> {
        let path = self.config_path()?;
        let loaded = AtomicTomlFile::<AppConfig>::new(path.clone()).load()?;
        if loaded.is_none() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
        }
        Ok(loaded.unwrap_or_default())
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup(ENV_ORACLE_ENDPOINT).filter(|v| !v.trim().is_empty()) {
        config.oracle.endpoint = Some(endpoint);
    }
    if let Some(key) = lookup(ENV_ORACLE_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.oracle.api_key = Some(key);
    }
}

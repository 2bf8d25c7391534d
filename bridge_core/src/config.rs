//! # Configuration
//!
//! Runtime settings, read from TOML. Every field has a default, so an empty
//! file (or no file at all) gives a working local setup:
//!
//! ```toml
//! location_table = "sites.toml"   # optional replacement for the builtin table
//!
//! [api]
//! base_url = "http://localhost:8000/api"
//! probe_timeout_ms = 2000
//! request_timeout_ms = 5000
//!
//! [form]
//! debounce_ms = 1000
//! ```
//!
//! `BRIDGEFORM_API_URL` in the environment overrides `api.base_url`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::location::LocationTable;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "bridgeform.toml";

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "BRIDGEFORM_API_URL";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub api: ApiConfig,
    pub form: FormConfig,
    /// TOML file replacing the builtin location table
    pub location_table: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Connectivity probe timeout
    pub probe_timeout_ms: u64,
    /// Timeout for every other call
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000/api".to_string(),
            probe_timeout_ms: 2000,
            request_timeout_ms: 5000,
        }
    }
}

impl ApiConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Quiet period before an edited geometry is sent for remote checking
    pub debounce_ms: u64,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig { debounce_ms: 1000 }
    }
}

impl FormConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl BridgeConfig {
    /// Parse from TOML text. `origin` names the source in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> BridgeResult<Self> {
        toml::from_str(text).map_err(|e| BridgeError::config(origin, e.to_string()))
    }

    /// Load configuration.
    ///
    /// With an explicit path the file must exist and parse. Without one,
    /// `bridgeform.toml` in the working directory is used if present,
    /// defaults otherwise. The environment override is applied last.
    pub fn load(path: Option<&Path>) -> BridgeResult<Self> {
        let mut config = match path {
            Some(p) => Self::read(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::read(default)?
                } else {
                    BridgeConfig::default()
                }
            }
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url.trim().to_string();
            }
        }

        tracing::debug!(base_url = %config.api.base_url, "configuration loaded");
        Ok(config)
    }

    fn read(path: &Path) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// The configured location table, or the builtin one
    pub fn location_table(&self) -> BridgeResult<LocationTable> {
        match &self.location_table {
            Some(path) => LocationTable::load(path),
            None => LocationTable::builtin().cloned(),
        }
    }
}

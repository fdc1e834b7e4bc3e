//! Service configuration and user preferences.
//!
//! Two very different lifetimes live here:
//!
//! - [`ServiceConfig`] is deployment configuration: endpoint URLs and an
//!   HTTP timeout, read once at startup from a TOML file with env-var
//!   overrides (loaded via dotenv in `main`).
//! - [`Preferences`] is per-user state: theme, auto-refresh, interval,
//!   default zoom. It round-trips through the key-value store and falls
//!   back to defaults whenever the stored copy is missing or unreadable.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::logging::{self, SourceKind};
use crate::storage::KvStore;

// ---------------------------------------------------------------------------
// Service configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the fused data API (regions, crowd reports, weather).
    pub api_base_url: String,
    /// Base URL of the AI camera API.
    pub camera_api_url: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Path of the JSON key-value store file.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Optional log file for daemon operation.
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_store_path() -> String {
    "riomon_store.json".to_string()
}

impl ServiceConfig {
    /// Loads configuration from a TOML file, then applies environment
    /// overrides (`RIOMON_API_BASE_URL`, `RIOMON_CAMERA_API_URL`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("cannot read config {}: {}", path.as_ref().display(), e))?;
        let mut config: ServiceConfig =
            toml::from_str(&text).map_err(|e| format!("invalid config: {}", e))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("RIOMON_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(url) = env::var("RIOMON_CAMERA_API_URL") {
            self.camera_api_url = url;
        }
    }
}

// ---------------------------------------------------------------------------
// User preferences
// ---------------------------------------------------------------------------

/// Key under which preferences are persisted (namespaced by the store).
pub const PREFERENCES_KEY: &str = "preferences";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub auto_refresh: bool,
    pub refresh_interval_secs: u64,
    pub default_zoom: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            theme: "light".to_string(),
            auto_refresh: true,
            refresh_interval_secs: 60,
            default_zoom: 10.0,
        }
    }
}

impl Preferences {
    /// Loads preferences from the store, falling back to defaults if the
    /// entry is missing or cannot be deserialized. Never an error - a
    /// broken preferences blob just means default preferences.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> Self {
        match store.get(PREFERENCES_KEY) {
            Some(value) => match serde_json::from_value(value) {
                Ok(prefs) => prefs,
                Err(e) => {
                    logging::warn(
                        SourceKind::Storage,
                        None,
                        &format!("unreadable preferences, using defaults: {}", e),
                    );
                    Preferences::default()
                }
            },
            None => Preferences::default(),
        }
    }

    pub fn save<S: KvStore + ?Sized>(&self, store: &mut S) {
        match serde_json::to_value(self) {
            Ok(value) => store.set(PREFERENCES_KEY, value),
            Err(e) => logging::error(
                SourceKind::Storage,
                None,
                &format!("cannot serialize preferences: {}", e),
            ),
        }
    }
}

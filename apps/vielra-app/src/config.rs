//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VIELRA_LANGUAGE=vi                                                 │
//! │     VIELRA_API_URL=https://api.vielra.app                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/vielra/vielra.toml (Linux)                               │
//! │     ~/Library/Application Support/app.vielra.vielra/vielra.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [app]
//! name = "Vielra"
//! default_language = "en"
//! default_palette_mode = "light"
//!
//! [api]
//! base_url = "https://api.vielra.app"
//! effect_deadline_secs = 30
//!
//! [storage]
//! # path = "/custom/vielra.db"
//! root_key = "vielra"
//! debounce_ms = 250
//! buffer_capacity = 256
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vielra_core::{ConfigurationError, LanguageCode, PaletteMode};
use vielra_effects::{OfflineApiClient, OrchestratorConfig};
use vielra_store::gate::{DEFAULT_DEBOUNCE_MS, DEFAULT_ROOT_KEY};
use vielra_store::store::DEFAULT_BUFFER_CAPACITY;
use vielra_store::{GateConfig, StoreConfig};

use crate::error::{AppError, AppResult};

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Language before the user picks one; also the translation fallback.
    #[serde(default)]
    pub default_language: LanguageCode,

    #[serde(default)]
    pub default_palette_mode: PaletteMode,
}

fn default_app_name() -> String {
    "Vielra".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            name: default_app_name(),
            default_language: LanguageCode::default(),
            default_palette_mode: PaletteMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline for effects that do not declare one. 0 disables it.
    #[serde(default = "default_effect_deadline")]
    pub effect_deadline_secs: u64,
}

fn default_base_url() -> String {
    "https://api.vielra.app".to_string()
}

fn default_effect_deadline() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            effect_deadline_secs: default_effect_deadline(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_root_key")]
    pub root_key: String,

    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_root_key() -> String {
    DEFAULT_ROOT_KEY.to_string()
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            path: None,
            root_key: default_root_key(),
            debounce_ms: default_debounce(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (vielra.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config - using defaults");
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> AppResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| AppError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigurationError::Invalid("app.name must not be empty".into()));
        }

        let url = &self.api.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigurationError::Invalid(format!(
                "api.base_url must start with http:// or https://, got: {url}"
            )));
        }

        if self.storage.root_key.is_empty() || self.storage.root_key.contains(':') {
            return Err(ConfigurationError::Invalid(
                "storage.root_key must be non-empty and contain no ':'".into(),
            ));
        }

        if self.storage.buffer_capacity == 0 {
            return Err(ConfigurationError::Invalid(
                "storage.buffer_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `VIELRA_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(language) = lookup("VIELRA_LANGUAGE") {
            match language.parse() {
                Ok(parsed) => {
                    debug!(language = %language, "Overriding default language from environment");
                    self.app.default_language = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring VIELRA_LANGUAGE"),
            }
        }

        if let Some(mode) = lookup("VIELRA_PALETTE_MODE") {
            match mode.parse() {
                Ok(parsed) => self.app.default_palette_mode = parsed,
                Err(e) => warn!(error = %e, "Ignoring VIELRA_PALETTE_MODE"),
            }
        }

        if let Some(url) = lookup("VIELRA_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(path) = lookup("VIELRA_DB_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(key) = lookup("VIELRA_PERSIST_KEY") {
            self.storage.root_key = key;
        }

        if let Some(ms) = lookup("VIELRA_DEBOUNCE_MS") {
            if let Ok(ms) = ms.parse() {
                self.storage.debounce_ms = ms;
            }
        }

        if let Some(secs) = lookup("VIELRA_EFFECT_DEADLINE_SECS") {
            if let Ok(secs) = secs.parse() {
                self.api.effect_deadline_secs = secs;
            }
        }

        if let Some(capacity) = lookup("VIELRA_BUFFER_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                self.storage.buffer_capacity = capacity;
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("app", "vielra", "vielra")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("vielra.toml"))
    }

    /// Database file, creating the data directory when the default is used.
    pub fn database_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        let dirs = Self::project_dirs()
            .ok_or_else(|| AppError::Config("Could not determine app data directory".into()))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("vielra.db"))
    }

    // =========================================================================
    // Component Configs
    // =========================================================================

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().buffer_capacity(self.storage.buffer_capacity)
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig::default()
            .root_key(self.storage.root_key.clone())
            .debounce(Duration::from_millis(self.storage.debounce_ms))
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let deadline = match self.api.effect_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        OrchestratorConfig::default().default_deadline(deadline)
    }

    /// API client bound to `api.base_url`.
    pub fn api_client(&self) -> OfflineApiClient {
        OfflineApiClient::new(self.api.base_url.clone())
    }
}

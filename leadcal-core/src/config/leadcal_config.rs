//! Global leadcal configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SyncError, SyncResult};

const DEFAULT_CALLBACK_PORT: u16 = 8085;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;

fn default_callback_port() -> u16 {
    DEFAULT_CALLBACK_PORT
}

fn default_auth_timeout_secs() -> u64 {
    DEFAULT_AUTH_TIMEOUT_SECS
}

/// Global configuration at ~/.config/leadcal/config.toml
///
/// Every key can be overridden with a `LEADCAL_`-prefixed environment
/// variable (e.g. `LEADCAL_BACKEND_URL`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LeadcalConfig {
    /// Base URL of the hosted backend project.
    #[serde(default)]
    pub backend_url: String,

    /// Public API key sent with every backend request.
    #[serde(default)]
    pub anon_key: String,

    /// Origin cross-context auth messages must come from. Defaults to the
    /// loopback listener's own origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_origin: Option<String>,

    #[serde(default = "default_callback_port")]
    pub callback_port: u16,

    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
}

impl Default for LeadcalConfig {
    fn default() -> Self {
        LeadcalConfig {
            backend_url: String::new(),
            anon_key: String::new(),
            app_origin: None,
            callback_port: DEFAULT_CALLBACK_PORT,
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
        }
    }
}

impl LeadcalConfig {
    pub fn config_path() -> SyncResult<PathBuf> {
        Ok(super::base_dir()?.join("config.toml"))
    }

    /// Load ~/.config/leadcal/config.toml, creating a commented template on
    /// first run, then apply environment overrides.
    pub fn load() -> SyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> SyncResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("LEADCAL").try_parsing(true))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> SyncResult<()> {
        let contents = format!(
            "\
# leadcal configuration

# Base URL of your backend project:
# backend_url = \"https://your-project.supabase.co\"

# Public (anon) API key of the project:
# anon_key = \"\"

# Port the OAuth callback listener binds on localhost:
# callback_port = {DEFAULT_CALLBACK_PORT}

# Seconds to wait for the browser authorization before giving up:
# auth_timeout_secs = {DEFAULT_AUTH_TIMEOUT_SECS}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// The backend base URL, validated.
    pub fn backend_url(&self) -> SyncResult<Url> {
        if self.backend_url.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "backend_url is not set. Add it to {} or set LEADCAL_BACKEND_URL",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".into())
            )));
        }

        Url::parse(&self.backend_url)
            .map_err(|e| SyncError::Config(format!("Invalid backend_url: {e}")))
    }

    /// Origin of the loopback listener, e.g. `http://127.0.0.1:8085`.
    pub fn callback_origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.callback_port)
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.callback_origin())
    }

    pub fn app_origin(&self) -> String {
        self.app_origin
            .clone()
            .unwrap_or_else(|| self.callback_origin())
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}

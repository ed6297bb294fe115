//! Client configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `DEVTRACK_*` environment variables (`DEVTRACK_API_BASE_URL`,
//! `DEVTRACK_CAPTCHA_SITE_KEY`, `DEVTRACK_REQUEST_TIMEOUT_SECS`, ...).

use crate::error::{CoreError, CoreResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the DevTrack REST API
    pub api_base_url: String,

    /// Captcha site key, passed through to front ends untouched
    #[serde(default)]
    pub captcha_site_key: Option<String>,

    /// Timeout applied to every API call, including token refresh
    pub request_timeout_secs: u64,

    /// Path of the token refresh endpoint, relative to the base URL
    pub refresh_path: String,

    /// How often the idle monitor checks for inactivity
    pub idle_check_interval_secs: u64,

    /// Directory holding the persisted auth record and logs
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            captcha_site_key: None,
            request_timeout_secs: 30,
            refresh_path: "/api/auth/token/refresh/".to_string(),
            idle_check_interval_secs: 60,
            data_dir: default_data_dir(),
        }
    }
}

/// Platform data directory for DevTrack, or `./devtrack` as a fallback
pub fn default_data_dir() -> PathBuf {
    match ProjectDirs::from("org", "DevTrack", "devtrack") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            warn!("Failed to determine platform data directory, using ./devtrack");
            PathBuf::from("./devtrack")
        }
    }
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, a value has the wrong
    /// type, or the resulting configuration fails [`ClientConfig::validate`]
    pub fn load(file: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("refresh_path", defaults.refresh_path)?
            .set_default("idle_check_interval_secs", defaults.idle_check_interval_secs)?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("DEVTRACK"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde alone cannot
    pub fn validate(&self) -> CoreResult<()> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            CoreError::invalid_config(format!("api_base_url {:?}: {e}", self.api_base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "api_base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if !self.refresh_path.starts_with('/') {
            return Err(CoreError::invalid_config("refresh_path must start with '/'"));
        }
        if self.idle_check_interval_secs == 0 {
            return Err(CoreError::invalid_config(
                "idle_check_interval_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_secs(self.idle_check_interval_secs)
    }
}

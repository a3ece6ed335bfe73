use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

/// Environment variable that overrides [`ClientConfig::base_url`].
pub const BASE_URL_ENV_VAR: &str = "LAYOFF_API_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_session_expiry_minutes")]
    pub session_expiry_minutes: i64,
    #[serde(default = "default_refresh_threshold_minutes")]
    pub refresh_threshold_minutes: i64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_base_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_session_expiry_minutes() -> i64 {
    30
}

fn default_refresh_threshold_minutes() -> i64 {
    5
}

fn default_page_size() -> u32 {
    20
}

fn default_event_capacity() -> usize {
    100
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            session_expiry_minutes: default_session_expiry_minutes(),
            refresh_threshold_minutes: default_refresh_threshold_minutes(),
            default_page_size: default_page_size(),
            storage_path: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl ClientConfig {
    /// Upper bound for a single outbound call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session lifetime used when the server does not send `expiresIn`.
    pub fn session_expiry(&self) -> TimeDelta {
        TimeDelta::minutes(self.session_expiry_minutes)
    }

    pub fn refresh_threshold(&self) -> TimeDelta {
        TimeDelta::minutes(self.refresh_threshold_minutes)
    }

    /// Resolves the session storage file, falling back to `~/.layoff/session.json`.
    pub fn resolved_storage_path(&self) -> Option<PathBuf> {
        self.storage_path.clone().or_else(|| {
            dirs::home_dir().map(|home| home.join(".layoff").join("session.json"))
        })
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.override_base_url(std::env::var(BASE_URL_ENV_VAR).ok().as_deref());
    }

    /// Replaces the base URL unless `url` is absent or blank.
    pub(crate) fn override_base_url(&mut self, url: Option<&str>) {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return;
        };
        log::debug!("Base URL overridden from {}", BASE_URL_ENV_VAR);
        self.base_url = url.to_string();
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_storage_path(mut self, path: PathBuf) -> Self {
        self.storage_path = Some(path);
        self
    }
}

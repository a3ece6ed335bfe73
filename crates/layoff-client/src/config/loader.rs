use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let mut config: ClientConfig = serde_json::from_str(content)?;
    config.apply_env_overrides();

    validate_config(&config)?;

    Ok(config)
}

pub(crate) fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let base_url = config.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation {
            message: "baseUrl must not be empty".to_string(),
        });
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("baseUrl must be an http(s) URL, got '{}'", base_url),
        });
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "requestTimeoutSecs must be positive".to_string(),
        });
    }

    if config.default_page_size == 0 {
        return Err(ConfigError::Validation {
            message: "defaultPageSize must be positive".to_string(),
        });
    }

    if config.session_expiry_minutes <= 0 {
        return Err(ConfigError::Validation {
            message: "sessionExpiryMinutes must be positive".to_string(),
        });
    }

    if config.refresh_threshold_minutes < 0
        || config.refresh_threshold_minutes >= config.session_expiry_minutes
    {
        return Err(ConfigError::Validation {
            message: format!(
                "refreshThresholdMinutes ({}) must be between 0 and sessionExpiryMinutes ({})",
                config.refresh_threshold_minutes, config.session_expiry_minutes
            ),
        });
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "eventCapacity must be positive".to_string(),
        });
    }

    Ok(())
}

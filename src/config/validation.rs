use crate::config::types::{
    CatalogConfig, Config, HarvestConfig, RetryConfig, ScheduleConfig, ServerConfig,
    StorageConfig,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_harvest_config(&config.harvest)?;
    validate_retry_config(&config.retry)?;
    validate_storage_config(&config.storage)?;
    validate_schedule_config(&config.schedule)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.page_path.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "page-path must contain the {{page}} placeholder, got '{}'",
            config.page_path
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates reorganization configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.page_length == 0 {
        return Err(ConfigError::Validation(
            "page-length must be >= 1".to_string(),
        ));
    }

    validate_pointer("identity-field", &config.identity_field)?;
    validate_pointer("score-field", &config.score_field)?;

    if !config.default_score.is_finite() {
        return Err(ConfigError::Validation(format!(
            "default-score must be a finite number, got {}",
            config.default_score
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.attempts == 0 {
        return Err(ConfigError::Validation(
            "retry attempts must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    let paths = [
        ("checkpoint-path", &config.checkpoint_path),
        ("raw-store-path", &config.raw_store_path),
        ("published-dir", &config.published_dir),
        ("serve-root", &config.serve_root),
    ];

    for (name, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.checkpoint_path == config.raw_store_path {
        return Err(ConfigError::Validation(
            "checkpoint-path and raw-store-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates schedule configuration
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "interval-secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates server configuration
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "Invalid bind-address '{}': {}",
            config.bind_address, e
        ))
    })?;
    Ok(())
}

/// A JSON pointer is either empty (the whole document) or starts with '/'
fn validate_pointer(name: &str, pointer: &str) -> Result<(), ConfigError> {
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} must be a JSON pointer starting with '/', got '{}'",
            name, pointer
        )));
    }
    Ok(())
}

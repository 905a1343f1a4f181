use crate::config::types::{
    BrowserConfig, Config, CrawlConfig, InteractionConfig, OutputConfig, PollConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser_config(&config.browser)?;
    validate_crawl_config(&config.crawl)?;
    validate_poll_config(&config.poll)?;
    validate_interaction_config(&config.interaction)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if let Some(remote) = &config.remote_debugging_url {
        let url = Url::parse(remote).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid remote_debugging_url '{}': {}", remote, e))
        })?;

        if !matches!(url.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "remote_debugging_url '{}' must use ws, wss, http or https",
                remote
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", config.start_url, e))
    })?;

    if url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "start_url '{}' must use HTTPS scheme",
            config.start_url
        )));
    }

    if config.stall_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "stall_limit must be >= 1, got {}",
            config.stall_limit
        )));
    }

    if config.review_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "review_cap must be >= 1, got {}",
            config.review_cap
        )));
    }

    Ok(())
}

fn validate_poll_config(config: &PollConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < config.attempt_wait_ms {
        return Err(ConfigError::Validation(format!(
            "poll timeout_ms ({}) must be >= attempt_wait_ms ({})",
            config.timeout_ms, config.attempt_wait_ms
        )));
    }

    Ok(())
}

fn validate_interaction_config(config: &InteractionConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "interaction max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("json_path", &config.json_path),
        ("csv_path", &config.csv_path),
        ("checkpoint_path", &config.checkpoint_path),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.json_path == config.csv_path {
        return Err(ConfigError::Validation(
            "json_path and csv_path must differ".to_string(),
        ));
    }

    Ok(())
}

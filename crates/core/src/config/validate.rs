use super::{types::Config, ConfigError};

/// Validate configuration invariants the type system cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.crawl.end_page < config.crawl.start_page {
        return Err(ConfigError::ValidationError(format!(
            "crawl.end_page ({}) cannot be before crawl.start_page ({})",
            config.crawl.end_page, config.crawl.start_page
        )));
    }

    if config.pool.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "pool.max_concurrency cannot be 0".to_string(),
        ));
    }

    if config.file_host.enrich_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "file_host.enrich_concurrency cannot be 0".to_string(),
        ));
    }

    if config.matcher.accept_threshold < 0.0 {
        return Err(ConfigError::ValidationError(
            "matcher.accept_threshold cannot be negative".to_string(),
        ));
    }

    if let Some(metadata) = &config.metadata {
        if metadata.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "metadata.api_key cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

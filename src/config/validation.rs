use crate::config::types::Config;
use crate::ConfigError;

/// Upper bound on the worker count; more buys nothing against one host.
const MAX_WORKERS: usize = 64;

/// Upper bound on the politeness delay (one minute).
const MAX_CRAWL_DELAY_MS: u64 = 60_000;

/// Validates a parsed configuration
///
/// A zero `max-pages` is deliberately legal: it yields an immediate empty
/// crawl, which callers use as a dry run.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.workers == 0 {
        return Err(ConfigError::Validation(
            "crawler.workers must be at least 1".to_string(),
        ));
    }

    if config.crawler.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "crawler.workers must not exceed {MAX_WORKERS}"
        )));
    }

    if config.crawler.crawl_delay_ms > MAX_CRAWL_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "crawler.crawl-delay-ms must not exceed {MAX_CRAWL_DELAY_MS}"
        )));
    }

    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name must not be empty".to_string(),
        ));
    }

    if config.logo.url_tokens.is_empty() {
        return Err(ConfigError::Validation(
            "logo.url-tokens must not be empty".to_string(),
        ));
    }

    if config.logo.icon_sizes.iter().any(|&size| size <= 0) {
        return Err(ConfigError::Validation(
            "logo.icon-sizes entries must be positive".to_string(),
        ));
    }

    Ok(())
}

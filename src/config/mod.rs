//! Configuration module
//!
//! Loading, parsing, and validating TOML configuration files. Every field
//! carries a default, so a config file is optional; the CLI can override
//! the crawl budget fields.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{Config, CrawlerConfig, LogoConfig, UserAgentConfig};
pub use validation::validate;

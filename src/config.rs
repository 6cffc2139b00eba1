use std::time::Duration;

use thiserror::Error;

use crate::cli::Args;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Settings shared by the server, the views and static export.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub site_name: String,
    pub page_size: u32,
    pub revalidate: Duration,
    pub fetch_timeout: Duration,
    pub max_sessions: usize,
    pub max_cached_posts: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "spacetraveling".to_string(),
            page_size: 2,
            revalidate: Duration::from_secs(60 * 30),
            fetch_timeout: Duration::from_secs(10),
            max_sessions: 1024,
            max_cached_posts: 512,
        }
    }
}

impl SiteConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            site_name: args.site_name.trim().to_string(),
            page_size: args.page_size,
            revalidate: Duration::from_secs(args.revalidate_secs),
            fetch_timeout: Duration::from_secs(args.timeout_secs),
            max_sessions: args.max_sessions,
            max_cached_posts: args.max_cached_posts,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > 100 {
            return Err(ConfigError::InvalidValue {
                name: "page_size",
                message: format!("{} is outside 1..=100", self.page_size),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_sessions",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_cached_posts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_cached_posts",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.site_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "site_name",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// API origin, e.g. https://api.finboard.example/api
    pub base_url: String,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    /// Where the access token is cached between runs; None keeps it in memory
    pub token_cache_file: Option<PathBuf>,

    pub log_level: String,
}

impl Config {
    /// Load configuration from the environment with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config {
            base_url: std::env::var("API_BASE_URL")
                .context("API_BASE_URL is required (set it in the environment or a .env file)")?,

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: std::env::var("HTTP_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            token_cache_file: std::env::var("TOKEN_CACHE_FILE")
                .ok()
                .map(|s| expand_tilde(&s))
                .or_else(default_token_cache_file),

            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {}", self.base_url))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("API_BASE_URL must use http or https: {}", self.base_url);
        }

        Ok(())
    }

    /// Base URL parsed and normalized with a trailing slash so that
    /// joining relative endpoint paths keeps the full prefix
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).with_context(|| format!("invalid base URL: {}", self.base_url))
    }
}

/// Default location for the cached access token
pub fn default_token_cache_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("finboard").join("access-token"))
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

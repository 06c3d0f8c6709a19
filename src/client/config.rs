//! Client Configuration
//!
//! Validated `AppConfig` plus the bearer token, with environment overrides.

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Client configuration wrapper: validated settings plus the bearer token.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app, token: None })
    }

    /// Build from environment overrides
    ///
    /// Reads `CLIENT_API_URL`, `STUDYSYNC_TOKEN`, `STUDYSYNC_TYPING_MS_PER_CHAR`
    /// and `STUDYSYNC_TYPING_CAP_MS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = AppConfig::builder();
        if let Ok(url) = std::env::var("CLIENT_API_URL") {
            builder = builder.server_url(url);
        }
        if let Some(ms) = env_millis("STUDYSYNC_TYPING_MS_PER_CHAR")? {
            builder = builder.typing_ms_per_char(ms);
        }
        if let Some(ms) = env_millis("STUDYSYNC_TYPING_CAP_MS")? {
            builder = builder.typing_cap_ms(ms);
        }
        let mut config = Self::with_builder(builder)?;
        config.set_token(std::env::var("STUDYSYNC_TOKEN").ok().filter(|t| !t.is_empty()));
        Ok(config)
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    /// Full URL of the push channel
    pub fn push_url(&self) -> String {
        self.api_url(&self.app.push_path)
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}

fn env_millis(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: key,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

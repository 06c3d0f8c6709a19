//! Application configuration module
//!
//! Provides the validated configuration shared by the gateway and the two
//! controllers: where the API lives, how replies are paced and how the push
//! channel reconnects.

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Default API base URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default push-channel path, relative to the API base URL
pub const DEFAULT_PUSH_PATH: &str = "/notifications/stream";

/// Milliseconds of simulated typing per reply character
pub const DEFAULT_TYPING_MS_PER_CHAR: u64 = 20;

/// Upper bound for the simulated typing delay
pub const DEFAULT_TYPING_CAP_MS: u64 = 2000;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// API base URL, without a trailing slash
    pub server_url: String,
    /// Path of the server-sent event stream carrying push events
    pub push_path: String,
    /// Simulated typing delay per reply character
    pub typing_ms_per_char: u64,
    /// Cap for the simulated typing delay
    pub typing_cap_ms: u64,
    /// First reconnect delay of the push channel
    pub reconnect_base: Duration,
    /// Largest reconnect delay of the push channel
    pub reconnect_max: Duration,
    /// Buffer size of the push-event channel
    pub push_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            push_path: DEFAULT_PUSH_PATH.to_string(),
            typing_ms_per_char: DEFAULT_TYPING_MS_PER_CHAR,
            typing_cap_ms: DEFAULT_TYPING_CAP_MS,
            reconnect_base: Duration::from_millis(1000),
            reconnect_max: Duration::from_secs(30),
            push_buffer: 100,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.server_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                self.server_url,
                url.scheme()
            )));
        }
        if !self.push_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "push_path",
                reason: "must start with '/'".to_string(),
            });
        }
        if self.typing_cap_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "typing_cap_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.reconnect_base.is_zero() || self.reconnect_base > self.reconnect_max {
            return Err(ConfigError::InvalidValue {
                field: "reconnect_base",
                reason: "must be non-zero and not exceed reconnect_max".to_string(),
            });
        }
        if self.push_buffer == 0 {
            return Err(ConfigError::MissingValue("push_buffer"));
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    push_path: Option<String>,
    typing_ms_per_char: Option<u64>,
    typing_cap_ms: Option<u64>,
    reconnect_base: Option<Duration>,
    reconnect_max: Option<Duration>,
    push_buffer: Option<usize>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the push-channel path
    pub fn push_path(mut self, path: impl Into<String>) -> Self {
        self.push_path = Some(path.into());
        self
    }

    /// Set the per-character typing delay
    pub fn typing_ms_per_char(mut self, ms: u64) -> Self {
        self.typing_ms_per_char = Some(ms);
        self
    }

    /// Set the typing delay cap
    pub fn typing_cap_ms(mut self, ms: u64) -> Self {
        self.typing_cap_ms = Some(ms);
        self
    }

    /// Set the reconnect backoff window
    pub fn reconnect(mut self, base: Duration, max: Duration) -> Self {
        self.reconnect_base = Some(base);
        self.reconnect_max = Some(max);
        self
    }

    pub fn push_buffer(mut self, size: usize) -> Self {
        self.push_buffer = Some(size);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            server_url: self
                .server_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            push_path: self.push_path.unwrap_or(defaults.push_path),
            typing_ms_per_char: self.typing_ms_per_char.unwrap_or(defaults.typing_ms_per_char),
            typing_cap_ms: self.typing_cap_ms.unwrap_or(defaults.typing_cap_ms),
            reconnect_base: self.reconnect_base.unwrap_or(defaults.reconnect_base),
            reconnect_max: self.reconnect_max.unwrap_or(defaults.reconnect_max),
            push_buffer: self.push_buffer.unwrap_or(defaults.push_buffer),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

//! Configuration management for the Jenkins client

use std::{path::PathBuf, time::Duration};

use compact_str::CompactString;

use super::error::{ClientError, Result};
use crate::{config::CliConfig, logging::LoggingConfig};

/// Main configuration for the Jenkins client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Jenkins root URL, e.g. `https://ci.example.com/`
    pub base_url: CompactString,
    /// User id the API token belongs to
    pub user: CompactString,
    /// API token, sent as the basic-auth password
    pub api_token: CompactString,
    /// Build polling configuration
    pub polling: PollingConfig,
    /// Request configuration
    pub request: RequestConfig,
    /// Debug configuration
    pub debug: DebugConfig,
}

/// Build polling configuration
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between build status and progressive log requests
    pub build_interval: Duration,
    /// Upper bound for waiting on a single build
    pub wait_timeout: Duration,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Fetch a CSRF crumb before every POST
    pub use_crumb: bool,
}

/// Debug and logging configuration
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Enable debug logging of HTTP responses
    pub log_responses: bool,
    /// Directory for storing debug logs
    pub log_directory: Option<PathBuf>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            build_interval: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(600),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), use_crumb: false }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_responses: false,
            log_directory: Some(LoggingConfig::default_log_dir().join("responses")),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(
        base_url: impl Into<CompactString>,
        user: impl Into<CompactString>,
        api_token: impl Into<CompactString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            user: user.into(),
            api_token: api_token.into(),
            polling: PollingConfig::default(),
            request: RequestConfig::default(),
            debug: DebugConfig::default(),
        }
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config_validation("base_url", "cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "base_url",
                "must start with http:// or https://",
            ));
        }

        if reqwest::Url::parse(&self.base_url).is_err() {
            return Err(ClientError::config_validation("base_url", "is not a valid URL"));
        }

        if self.user.is_empty() {
            return Err(ClientError::config_validation("user", "cannot be empty"));
        }

        if self.api_token.is_empty() {
            return Err(ClientError::config_validation("api_token", "cannot be empty"));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config("Timeout must be greater than zero"));
        }

        if self.polling.build_interval.is_zero() {
            return Err(ClientError::config("Build polling interval must be greater than zero"));
        }

        Ok(())
    }
}

impl TryFrom<CliConfig> for ClientConfig {
    type Error = ClientError;

    fn try_from(config: CliConfig) -> Result<Self> {
        let config = Self::new(config.jenkins_url, config.jenkins_user, config.jenkins_token);
        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    /// Set polling configuration
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Set request configuration
    pub fn with_request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }

    /// Set debug configuration
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// Enable debug logging
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug.log_responses = enabled;
        self
    }

    /// Enable CSRF crumb handling
    pub fn with_crumb(mut self, enabled: bool) -> Self {
        self.request.use_crumb = enabled;
        self
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<CompactString>,
    user: Option<CompactString>,
    api_token: Option<CompactString>,
    polling: Option<PollingConfig>,
    request: Option<RequestConfig>,
    debug: Option<DebugConfig>,
}

impl ClientConfigBuilder {
    /// Set base URL
    pub fn base_url(mut self, url: impl Into<CompactString>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set user id
    pub fn user(mut self, user: impl Into<CompactString>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set API token
    pub fn api_token(mut self, token: impl Into<CompactString>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set polling configuration
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.polling = Some(polling);
        self
    }

    /// Set request configuration
    pub fn request(mut self, request: RequestConfig) -> Self {
        self.request = Some(request);
        self
    }

    /// Set debug configuration
    pub fn debug(mut self, debug: DebugConfig) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Enable debug logging
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        let mut debug = self.debug.unwrap_or_default();
        debug.log_responses = enabled;
        self.debug = Some(debug);
        self
    }

    /// Set build polling interval
    pub fn build_interval(mut self, interval: Duration) -> Self {
        let mut polling = self.polling.unwrap_or_default();
        polling.build_interval = interval;
        self.polling = Some(polling);
        self
    }

    /// Set the maximum time to wait for a build
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        let mut polling = self.polling.unwrap_or_default();
        polling.wait_timeout = timeout;
        self.polling = Some(polling);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let mut request = self.request.unwrap_or_default();
        request.timeout = timeout;
        self.request = Some(request);
        self
    }

    /// Enable CSRF crumb handling
    pub fn use_crumb(mut self, enabled: bool) -> Self {
        let mut request = self.request.unwrap_or_default();
        request.use_crumb = enabled;
        self.request = Some(request);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::config("Base URL is required"))?;
        let user = self
            .user
            .ok_or_else(|| ClientError::config("User is required"))?;
        let api_token = self
            .api_token
            .ok_or_else(|| ClientError::config("API token is required"))?;

        let config = ClientConfig {
            base_url,
            user,
            api_token,
            polling: self.polling.unwrap_or_default(),
            request: self.request.unwrap_or_default(),
            debug: self.debug.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

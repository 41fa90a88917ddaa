//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested fields
//! use `__` as the separator, e.g. `SESSION__TTL_HOURS=12`.

use gatehouse_session::BrokerConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// JSON file used to populate the in-memory directory at startup.
    #[serde(default)]
    pub directory_seed: Option<PathBuf>,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Bound on each cache or provider call, in seconds.
    #[serde(default = "default_call_timeout_seconds")]
    pub call_timeout_seconds: u64,

    /// Timeout of the HTTP client used to reach identity providers, in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

/// Longest accepted session lifetime, in hours.
pub const MAX_TTL_HOURS: u64 = 24 * 365;

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_call_timeout_seconds() -> u64 {
    10
}

fn default_http_timeout_seconds() -> u64 {
    10
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            call_timeout_seconds: default_call_timeout_seconds(),
            http_timeout_seconds: default_http_timeout_seconds(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl SessionConfig {
    /// Session lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60))
    }

    /// HTTP client timeout for provider calls.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Checks values the deserializer cannot.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lifetime is zero or above
    /// [`MAX_TTL_HOURS`], or if the call timeout is zero.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.ttl_hours == 0 || self.ttl_hours > MAX_TTL_HOURS {
            return Err(config::ConfigError::Message(format!(
                "session.ttl_hours must be between 1 and {MAX_TTL_HOURS}, got {}",
                self.ttl_hours
            )));
        }
        if self.call_timeout_seconds == 0 {
            return Err(config::ConfigError::Message(
                "session.call_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Broker settings derived from this configuration.
    #[must_use]
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            session_ttl: self.ttl(),
            call_timeout: Duration::from_secs(self.call_timeout_seconds),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.session.validate()?;
        Ok(config)
    }
}

//! Shared application state.

use crate::config::ServerConfig;
use gatehouse_core::UlidGenerator;
use gatehouse_directory::{DirectorySeed, MemoryDirectory, RepositoryLookup};
use gatehouse_session::{MemoryCache, ProviderError, ProviderRegistry, SessionBroker};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The session broker.
    pub broker: SessionBroker,
    /// Whether to set the Secure flag on cookies.
    pub secure_cookies: bool,
    /// Lifetime of the session cookie.
    pub session_ttl: Duration,
}

impl AppState {
    /// Creates state around an existing broker.
    #[must_use]
    pub fn new(broker: SessionBroker, secure_cookies: bool) -> Self {
        let session_ttl = broker.config().session_ttl;
        Self {
            broker,
            secure_cookies,
            session_ttl,
        }
    }

    /// Wires the in-memory directory and cache, the provider registry, and
    /// the broker from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory seed cannot be loaded or the
    /// provider HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let directory = match &config.directory_seed {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| StartupError::Seed {
                    path: path.clone(),
                    details: e.to_string(),
                })?;
                let seed = DirectorySeed::from_json(&json).map_err(|e| StartupError::Seed {
                    path: path.clone(),
                    details: e.to_string(),
                })?;
                tracing::info!(
                    path = %path.display(),
                    realms = seed.realms.len(),
                    providers = seed.providers.len(),
                    users = seed.users.len(),
                    "loaded directory seed"
                );
                MemoryDirectory::from_seed(seed)
            }
            None => {
                tracing::warn!("no directory seed configured, starting with an empty directory");
                MemoryDirectory::new()
            }
        };

        let providers = ProviderRegistry::new(config.session.http_timeout())
            .map_err(StartupError::Providers)?;

        let broker = SessionBroker::new(
            Arc::new(RepositoryLookup::new(Arc::new(directory))),
            Arc::new(MemoryCache::new()),
            Arc::new(providers),
            Arc::new(UlidGenerator::with_prefix("ses")),
            config.session.broker_config(),
        );

        Ok(Self::new(broker, config.session.secure_cookies))
    }
}

/// Errors that prevent the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// The directory seed file could not be read or parsed.
    Seed { path: PathBuf, details: String },
    /// The provider registry could not be built.
    Providers(ProviderError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed { path, details } => {
                write!(f, "failed to load directory seed '{}': {details}", path.display())
            }
            Self::Providers(err) => write!(f, "failed to build provider registry: {err}"),
        }
    }
}

impl std::error::Error for StartupError {}

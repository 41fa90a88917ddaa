//! Provider instantiation.

use super::{GoogleEndpoints, GoogleProvider, OAuthProvider, ProviderKind};
use crate::error::ProviderError;
use crate::model::OAuthConfig;
use std::sync::Arc;
use std::time::Duration;

/// Builds a provider for an `OAuthConfig`.
pub trait ProviderFactory: Send + Sync {
    /// Instantiates the provider named by `config.provider_type`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config cannot back a provider.
    fn create(&self, config: &OAuthConfig) -> Result<Arc<dyn OAuthProvider>, ProviderError>;
}

/// The production factory. Every provider shares one HTTP client.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    http: reqwest::Client,
    google: GoogleEndpoints,
}

impl ProviderRegistry {
    /// Creates a registry whose HTTP client does not follow redirects and
    /// gives up after `http_timeout`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(http_timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(http_timeout)
            .build()
            .map_err(|e| ProviderError::Configuration {
                details: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            http,
            google: GoogleEndpoints::default(),
        })
    }

    /// Overrides the Google endpoints.
    #[must_use]
    pub fn with_google_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.google = endpoints;
        self
    }
}

impl ProviderFactory for ProviderRegistry {
    fn create(&self, config: &OAuthConfig) -> Result<Arc<dyn OAuthProvider>, ProviderError> {
        match config.provider_type {
            ProviderKind::Google => Ok(Arc::new(GoogleProvider::new(
                config,
                &self.google,
                self.http.clone(),
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(redirect_url: &str) -> OAuthConfig {
        OAuthConfig {
            provider_type: ProviderKind::Google,
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: redirect_url.to_string(),
        }
    }

    #[test]
    fn creates_google_provider() {
        let registry = ProviderRegistry::new(Duration::from_secs(5))
            .expect("registry")
            .with_google_endpoints(GoogleEndpoints::with_base("https://idp.test"));
        let provider = registry
            .create(&config("https://acme.test/auth/callback"))
            .expect("provider");
        let url = provider.auth_url("login:ses_1", "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert!(url.starts_with("https://idp.test/auth?"));
        assert!(url.contains("code_challenge_method=S256"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let registry = ProviderRegistry::new(Duration::from_secs(5)).expect("registry");
        assert!(matches!(
            registry.create(&config("::")),
            Err(ProviderError::Configuration { .. })
        ));
    }
}

//! OAuth2 identity providers.
//!
//! Each provider type implements `OAuthProvider`. The broker never names a
//! concrete provider; it asks a `ProviderFactory` to build one from an
//! `OAuthConfig`.

pub mod google;
pub mod registry;

pub use google::{GoogleEndpoints, GoogleProvider};
pub use registry::{ProviderFactory, ProviderRegistry};

pub use gatehouse_directory::ProviderKind;

use crate::error::{BrokerError, ProviderError};
use crate::model::{OAuthToken, UserInfo};
use async_trait::async_trait;

/// Capabilities every identity provider offers.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Builds the authorization URL the user is redirected to. `state` is
    /// passed through verbatim; the PKCE challenge is derived from
    /// `pkce_verifier`.
    fn auth_url(&self, state: &str, pkce_verifier: &str) -> String;

    /// Exchanges an authorization code for a token, proving possession of
    /// the verifier the authorization URL was built with.
    async fn authorize(&self, code: &str, pkce_verifier: &str)
    -> Result<OAuthToken, ProviderError>;

    /// Requests a new access token using the stored refresh token.
    async fn refresh_access_token(&self, token: &OAuthToken) -> Result<OAuthToken, ProviderError>;

    /// Revokes a token at the provider.
    async fn revoke_access_token(&self, token: &OAuthToken) -> Result<(), ProviderError>;

    /// Fetches the normalized profile of the token's owner.
    async fn user_info(&self, token: &OAuthToken) -> Result<UserInfo, ProviderError>;
}

/// Parses a stored provider type into a `ProviderKind`.
///
/// # Errors
///
/// Returns `UnsupportedProvider` for types without an implementation.
pub fn provider_kind(provider_type: &str) -> Result<ProviderKind, BrokerError> {
    provider_type
        .parse()
        .map_err(|_| BrokerError::UnsupportedProvider {
            provider_type: provider_type.to_string(),
        })
}

//! Federated OAuth2 session broker.
//!
//! This crate provides:
//! - Session records and the OAuth `state` encoding (`model`)
//! - The session cache contract and an in-memory TTL cache (`cache`)
//! - The identity provider abstraction, registry, and Google provider (`oauth`)
//! - The `SessionBroker` that drives login, refresh, logout, and API key
//!   verification
//!
//! # Session Lifecycle
//!
//! `provider_link` stores a Pending session and returns the provider's
//! authorization URL. The provider redirects back with a code and the same
//! `state`; `login` exchanges the code, fetches the profile, and writes the
//! session back as Active. `refresh` rotates the token and `logout` deletes
//! the session before revoking it. Any provider failure deletes the session.

pub mod broker;
pub mod cache;
pub mod error;
pub mod model;
pub mod oauth;

pub use broker::{BrokerConfig, LoginResult, SessionBroker};
pub use cache::{MemoryCache, SessionCache};
pub use error::{BrokerError, CacheError, ProviderError};
pub use model::{OAuthConfig, OAuthState, OAuthToken, UserInfo, UserSession};
pub use oauth::{
    GoogleEndpoints, GoogleProvider, OAuthProvider, ProviderFactory, ProviderKind,
    ProviderRegistry,
};

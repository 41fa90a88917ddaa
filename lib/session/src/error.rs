//! Error types for the session crate.
//!
//! `BrokerError` is the only error the broker returns. Provider and cache
//! failures are reclassified before they leave the broker; directory errors
//! keep their kind.

use gatehouse_directory::DirectoryError;
use std::fmt;

/// Errors returned by `SessionBroker` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The request is malformed.
    BadRequest { reason: String },
    /// The caller is not allowed to proceed.
    AccessDenied { reason: String },
    /// The session or record does not exist.
    NotFound { entity: &'static str, key: String },
    /// The session cache or directory store failed.
    Store { details: String },
    /// A record violates an invariant.
    Validation { reason: String },
    /// The provider type has no registered implementation.
    UnsupportedProvider { provider_type: String },
    /// A collaborator did not answer within the call timeout.
    Timeout { operation: &'static str },
}

impl BrokerError {
    /// Creates an access-denied error.
    #[must_use]
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Creates a session not-found error.
    #[must_use]
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "session",
            key: session_id.into(),
        }
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
            Self::AccessDenied { reason } => write!(f, "access denied: {reason}"),
            Self::NotFound { entity, key } => write!(f, "{entity} '{key}' not found"),
            Self::Store { details } => write!(f, "store error: {details}"),
            Self::Validation { reason } => write!(f, "validation failed: {reason}"),
            Self::UnsupportedProvider { provider_type } => {
                write!(f, "unsupported provider type '{provider_type}'")
            }
            Self::Timeout { operation } => write!(f, "{operation} timed out"),
        }
    }
}

impl std::error::Error for BrokerError {}

impl From<DirectoryError> for BrokerError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { entity, key } => Self::NotFound { entity, key },
            DirectoryError::AccessDenied(reason) => Self::access_denied(reason.to_string()),
            err @ (DirectoryError::Disabled { .. } | DirectoryError::Expired { .. }) => {
                Self::access_denied(err.to_string())
            }
            DirectoryError::Validation { reason } => Self::Validation { reason },
            DirectoryError::Store { details } => Self::Store { details },
        }
    }
}

impl From<CacheError> for BrokerError {
    fn from(err: CacheError) -> Self {
        Self::Store {
            details: err.to_string(),
        }
    }
}

/// Errors from an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider configuration is unusable (e.g., an invalid URL).
    Configuration { details: String },
    /// The authorization code could not be exchanged.
    TokenExchange { details: String },
    /// The token could not be refreshed.
    Refresh { details: String },
    /// The token could not be revoked.
    Revoke { details: String },
    /// The user profile could not be fetched or parsed.
    UserInfo { details: String },
    /// The provider did not answer within the call timeout.
    Timeout { operation: &'static str },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "provider configuration error: {details}"),
            Self::TokenExchange { details } => write!(f, "token exchange failed: {details}"),
            Self::Refresh { details } => write!(f, "token refresh failed: {details}"),
            Self::Revoke { details } => write!(f, "token revocation failed: {details}"),
            Self::UserInfo { details } => write!(f, "user info request failed: {details}"),
            Self::Timeout { operation } => write!(f, "provider {operation} timed out"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from the session cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache backend failed.
    Backend { details: String },
    /// A cached value could not be encoded or decoded.
    Codec { details: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { details } => write!(f, "cache backend error: {details}"),
            Self::Codec { details } => write!(f, "cache codec error: {details}"),
        }
    }
}

impl std::error::Error for CacheError {}

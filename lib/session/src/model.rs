//! Session records and the OAuth `state` encoding.
//!
//! A `UserSession` lives only in the session cache, serialized as JSON under
//! `session:{id}`. It is Pending until login attaches a token and profile.

use crate::error::CacheError;
use crate::oauth::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action used when a provider link is requested without one.
pub const DEFAULT_ACTION: &str = "login";

/// Client settings needed to talk to one provider on behalf of one realm.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub provider_type: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("provider_type", &self.provider_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Tokens issued by a provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Creates a token without a refresh token or expiry.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A provider profile normalized across provider types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// The provider's subject identifier.
    pub provider_user_id: String,
    /// Stable identifier matched against `User::bind_id`.
    pub bind_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A cache-resident login session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub realm_id: String,
    pub oauth_config: OAuthConfig,
    /// PKCE verifier for the pending authorization. Cleared on login.
    #[serde(default)]
    pub pkce_verifier: Option<String>,
    #[serde(default)]
    pub token: Option<OAuthToken>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
    pub last_updated: DateTime<Utc>,
}

impl UserSession {
    /// Creates a Pending session awaiting the code exchange for
    /// `pkce_verifier`.
    #[must_use]
    pub fn pending(
        realm_id: impl Into<String>,
        oauth_config: OAuthConfig,
        pkce_verifier: impl Into<String>,
    ) -> Self {
        Self {
            realm_id: realm_id.into(),
            oauth_config,
            pkce_verifier: Some(pkce_verifier.into()),
            token: None,
            user_info: None,
            last_updated: Utc::now(),
        }
    }

    /// Returns true if login has not completed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.token.is_none() && self.user_info.is_none()
    }

    /// Returns true if the session holds both a token and a profile.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.token.is_some() && self.user_info.is_some()
    }

    /// Attaches the login result, making the session Active.
    pub fn activate(&mut self, token: OAuthToken, user_info: UserInfo) {
        self.pkce_verifier = None;
        self.token = Some(token);
        self.user_info = Some(user_info);
        self.last_updated = Utc::now();
    }

    /// Serializes the session for the cache.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(self).map_err(|e| CacheError::Codec {
            details: e.to_string(),
        })
    }

    /// Deserializes a session read from the cache.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are not a session record.
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Codec {
            details: e.to_string(),
        })
    }
}

impl fmt::Debug for UserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSession")
            .field("realm_id", &self.realm_id)
            .field("oauth_config", &self.oauth_config)
            .field("has_pkce_verifier", &self.pkce_verifier.is_some())
            .field("token", &self.token)
            .field("user_info", &self.user_info)
            .field("last_updated", &self.last_updated)
            .finish()
    }
}

/// Cache key for a session ID.
#[must_use]
pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// The OAuth `state` parameter: `"{action}:{session_id}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub action: String,
    pub session_id: String,
}

impl OAuthState {
    /// Creates a state for `session_id`. A missing or empty action becomes
    /// `login`.
    #[must_use]
    pub fn new(action: Option<&str>, session_id: impl Into<String>) -> Self {
        Self {
            action: action
                .filter(|a| !a.is_empty())
                .unwrap_or(DEFAULT_ACTION)
                .to_string(),
            session_id: session_id.into(),
        }
    }

    /// Parses a state returned by a provider.
    ///
    /// Exactly two `:`-separated parts yield `(action, session_id)`. Anything
    /// else is taken whole as the session ID with the default action. Session
    /// IDs never contain `:`, so such a state can only miss in the cache.
    #[must_use]
    pub fn parse(state: &str) -> Self {
        let parts: Vec<&str> = state.split(':').collect();
        match parts.as_slice() {
            [action, session_id] => Self::new(Some(*action), *session_id),
            _ => Self::new(None, state),
        }
    }
}

impl fmt::Display for OAuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.session_id)
    }
}

//! Directory records and the inputs used to create and update them.
//!
//! Records are owned by the persistence layer; the broker and the services
//! only read them through the repository and lookup contracts.

use crate::error::DirectoryError;
use chrono::{DateTime, Utc};
use gatehouse_access::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tenant application boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    /// Unique identifier.
    pub id: String,
    /// Short code used in login links (e.g., "acme").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Disabled realms cannot start new logins.
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// When the realm was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the realm was last updated.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// An external OAuth2 identity provider configured for a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Unique identifier.
    pub id: String,
    /// The realm this provider belongs to.
    pub realm_id: String,
    /// Short code used in login links (e.g., "google").
    pub code: String,
    /// Provider kind (e.g., "google").
    pub provider_type: String,
    /// OAuth2 client ID registered with the provider.
    pub client_id: String,
    /// OAuth2 client secret.
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Callback URL registered with the provider.
    pub redirect_url: String,
    /// Disabled providers cannot start new logins.
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// When the provider was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the provider was last updated.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// The provider types with a registered implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
}

impl ProviderKind {
    /// Returns the lowercase name stored in provider records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            _ => Err(DirectoryError::validation(format!(
                "unsupported provider type '{s}'"
            ))),
        }
    }
}

/// A user record of a realm, bound to OAuth profiles by `bind_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: String,
    /// The realm this user belongs to.
    pub realm_id: String,
    /// Stable external identifier, typically the email address.
    pub bind_id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Administrative role.
    #[serde(default)]
    pub role: Role,
    /// When the user was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A non-human service account of a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daemon {
    /// Unique identifier.
    pub id: String,
    /// The realm this daemon belongs to.
    pub realm_id: String,
    /// Human-readable name.
    pub name: String,
    /// Administrative role.
    #[serde(default)]
    pub role: Role,
    /// When the daemon was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the daemon was last updated.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// An API key issued to a daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Unique identifier.
    pub id: String,
    /// The realm the key is valid for.
    pub realm_id: String,
    /// The daemon the key was issued to.
    pub daemon_id: String,
    /// The secret key value.
    #[serde(skip_serializing)]
    pub value: String,
    /// Disabled keys fail verification.
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Keys past this instant fail verification.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Returns true if the key has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}

fn enabled() -> bool {
    true
}

/// Input for creating a realm.
#[derive(Debug, Clone, Default)]
pub struct NewRealm {
    pub code: String,
    pub name: String,
}

/// Changes to a realm. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RealmUpdate {
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

/// Input for creating a provider.
#[derive(Debug, Clone, Default)]
pub struct NewProvider {
    pub code: String,
    pub provider_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Changes to a provider. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProviderUpdate {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_url: Option<String>,
    pub enabled: Option<bool>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub bind_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

/// Changes to a user. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Input for creating a daemon.
#[derive(Debug, Clone, Default)]
pub struct NewDaemon {
    pub name: String,
    pub role: Role,
}

/// Changes to a daemon. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DaemonUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
}

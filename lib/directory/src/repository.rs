//! Repository contracts for directory records.
//!
//! These traits are the boundary to the persistence layer. List operations
//! take the caller's `Principal` so scoping is applied by the store itself.

use crate::error::DirectoryError;
use crate::model::{ApiKey, Daemon, Provider, Realm, User};
use async_trait::async_trait;
use gatehouse_access::Principal;

/// Storage for realms.
#[async_trait]
pub trait RealmRepository: Send + Sync {
    /// Lists realms visible to `scope`.
    async fn list_realms(&self, scope: &Principal) -> Result<Vec<Realm>, DirectoryError>;

    /// Gets a realm by ID.
    async fn get_realm(&self, id: &str) -> Result<Realm, DirectoryError>;

    /// Finds a realm by its code.
    async fn realm_by_code(&self, code: &str) -> Result<Realm, DirectoryError>;

    /// Inserts a new realm.
    async fn insert_realm(&self, realm: Realm) -> Result<(), DirectoryError>;

    /// Replaces an existing realm.
    async fn update_realm(&self, realm: Realm) -> Result<(), DirectoryError>;

    /// Deletes a realm.
    async fn delete_realm(&self, id: &str) -> Result<(), DirectoryError>;
}

/// Storage for OAuth providers.
#[async_trait]
pub trait ProviderRepository: Send + Sync {
    /// Lists providers visible to `scope`.
    async fn list_providers(&self, scope: &Principal) -> Result<Vec<Provider>, DirectoryError>;

    /// Gets a provider by realm and ID.
    async fn get_provider(&self, realm_id: &str, id: &str) -> Result<Provider, DirectoryError>;

    /// Finds a provider of a realm by its code.
    async fn provider_by_code(&self, realm_id: &str, code: &str)
    -> Result<Provider, DirectoryError>;

    /// Inserts a new provider.
    async fn insert_provider(&self, provider: Provider) -> Result<(), DirectoryError>;

    /// Replaces an existing provider.
    async fn update_provider(&self, provider: Provider) -> Result<(), DirectoryError>;

    /// Deletes a provider.
    async fn delete_provider(&self, realm_id: &str, id: &str) -> Result<(), DirectoryError>;
}

/// Storage for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Lists users visible to `scope`.
    async fn list_users(&self, scope: &Principal) -> Result<Vec<User>, DirectoryError>;

    /// Gets a user by realm and ID.
    async fn get_user(&self, realm_id: &str, id: &str) -> Result<User, DirectoryError>;

    /// Finds a user of a realm by bind ID.
    async fn user_by_bind_id(&self, realm_id: &str, bind_id: &str)
    -> Result<User, DirectoryError>;

    /// Inserts a new user.
    async fn insert_user(&self, user: User) -> Result<(), DirectoryError>;

    /// Replaces an existing user.
    async fn update_user(&self, user: User) -> Result<(), DirectoryError>;

    /// Deletes a user.
    async fn delete_user(&self, realm_id: &str, id: &str) -> Result<(), DirectoryError>;
}

/// Storage for daemons.
#[async_trait]
pub trait DaemonRepository: Send + Sync {
    /// Lists daemons visible to `scope`.
    async fn list_daemons(&self, scope: &Principal) -> Result<Vec<Daemon>, DirectoryError>;

    /// Gets a daemon by realm and ID.
    async fn get_daemon(&self, realm_id: &str, id: &str) -> Result<Daemon, DirectoryError>;

    /// Inserts a new daemon.
    async fn insert_daemon(&self, daemon: Daemon) -> Result<(), DirectoryError>;

    /// Replaces an existing daemon.
    async fn update_daemon(&self, daemon: Daemon) -> Result<(), DirectoryError>;

    /// Deletes a daemon.
    async fn delete_daemon(&self, realm_id: &str, id: &str) -> Result<(), DirectoryError>;
}

/// Storage for API keys.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Finds a key of a realm by its secret value.
    async fn api_key_by_value(&self, realm_id: &str, value: &str)
    -> Result<ApiKey, DirectoryError>;

    /// Inserts a new key.
    async fn insert_api_key(&self, key: ApiKey) -> Result<(), DirectoryError>;
}

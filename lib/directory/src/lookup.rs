//! Read-side lookups used by the session broker.
//!
//! `Lookup` is the narrow view of the directory the broker needs. It checks
//! enabled and expiry flags so callers only ever see usable records.

use crate::error::DirectoryError;
use crate::model::{ApiKey, Provider, Realm, User};
use crate::repository::{ApiKeyRepository, ProviderRepository, RealmRepository, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Directory queries consulted during login, session reads, and key
/// verification.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Resolves an enabled realm by its code.
    async fn lookup_realm(&self, code: &str) -> Result<Realm, DirectoryError>;

    /// Resolves an enabled provider of a realm by its code.
    async fn lookup_provider(&self, realm_id: &str, code: &str)
    -> Result<Provider, DirectoryError>;

    /// Resolves a usable API key of a realm by its value.
    async fn lookup_api_key(&self, realm_id: &str, key: &str) -> Result<ApiKey, DirectoryError>;

    /// Finds a user of a realm by bind ID.
    async fn user_by_bind_id(&self, realm_id: &str, bind_id: &str)
    -> Result<User, DirectoryError>;
}

/// Repository-backed store that can serve lookups.
pub trait LookupStore: RealmRepository + ProviderRepository + UserRepository + ApiKeyRepository {}

impl<T> LookupStore for T where
    T: RealmRepository + ProviderRepository + UserRepository + ApiKeyRepository
{
}

/// `Lookup` implemented over the repository contracts.
pub struct RepositoryLookup<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> RepositoryLookup<S> {
    /// Creates a lookup over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: ?Sized> Clone for RepositoryLookup<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[async_trait]
impl<S> Lookup for RepositoryLookup<S>
where
    S: LookupStore + ?Sized,
{
    async fn lookup_realm(&self, code: &str) -> Result<Realm, DirectoryError> {
        let realm = self.store.realm_by_code(code).await?;
        if !realm.enabled {
            debug!(realm = %code, "realm is disabled");
            return Err(DirectoryError::Disabled {
                entity: "realm",
                key: code.to_string(),
            });
        }
        Ok(realm)
    }

    async fn lookup_provider(
        &self,
        realm_id: &str,
        code: &str,
    ) -> Result<Provider, DirectoryError> {
        let provider = self.store.provider_by_code(realm_id, code).await?;
        if !provider.enabled {
            debug!(realm_id = %realm_id, provider = %code, "provider is disabled");
            return Err(DirectoryError::Disabled {
                entity: "provider",
                key: code.to_string(),
            });
        }
        Ok(provider)
    }

    async fn lookup_api_key(&self, realm_id: &str, key: &str) -> Result<ApiKey, DirectoryError> {
        let api_key = self.store.api_key_by_value(realm_id, key).await?;
        if !api_key.enabled {
            return Err(DirectoryError::Disabled {
                entity: "api key",
                key: api_key.id,
            });
        }
        if api_key.is_expired_at(Utc::now()) {
            return Err(DirectoryError::Expired {
                entity: "api key",
                key: api_key.id,
            });
        }
        Ok(api_key)
    }

    async fn user_by_bind_id(
        &self,
        realm_id: &str,
        bind_id: &str,
    ) -> Result<User, DirectoryError> {
        self.store.user_by_bind_id(realm_id, bind_id).await
    }
}

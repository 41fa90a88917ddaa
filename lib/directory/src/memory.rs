//! In-memory directory store.
//!
//! Used by tests and by the development server. Records live in hash maps
//! behind a single `RwLock`; list operations apply the caller's `Principal`.

use crate::error::DirectoryError;
use crate::model::{ApiKey, Daemon, Provider, Realm, User};
use crate::repository::{
    ApiKeyRepository, DaemonRepository, ProviderRepository, RealmRepository, UserRepository,
};
use async_trait::async_trait;
use gatehouse_access::Principal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Records used to populate a `MemoryDirectory`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub realms: Vec<Realm>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub daemons: Vec<Daemon>,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

impl DirectorySeed {
    /// Parses a seed from JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Default)]
struct Tables {
    realms: HashMap<String, Realm>,
    providers: HashMap<String, Provider>,
    users: HashMap<String, User>,
    daemons: HashMap<String, Daemon>,
    api_keys: HashMap<String, ApiKey>,
}

/// A directory held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding the records of `seed`.
    #[must_use]
    pub fn from_seed(seed: DirectorySeed) -> Self {
        let tables = Tables {
            realms: seed.realms.into_iter().map(|r| (r.id.clone(), r)).collect(),
            providers: seed
                .providers
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            users: seed.users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            daemons: seed.daemons.into_iter().map(|d| (d.id.clone(), d)).collect(),
            api_keys: seed.api_keys.into_iter().map(|k| (k.id.clone(), k)).collect(),
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DirectoryError> {
        self.tables.read().map_err(|e| DirectoryError::Store {
            details: e.to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DirectoryError> {
        self.tables.write().map_err(|e| DirectoryError::Store {
            details: e.to_string(),
        })
    }
}

fn insert_new<T>(
    map: &mut HashMap<String, T>,
    entity: &'static str,
    id: String,
    record: T,
) -> Result<(), DirectoryError> {
    if map.contains_key(&id) {
        return Err(DirectoryError::validation(format!(
            "{entity} '{id}' already exists"
        )));
    }
    map.insert(id, record);
    Ok(())
}

fn replace<T>(
    map: &mut HashMap<String, T>,
    entity: &'static str,
    id: String,
    record: T,
) -> Result<(), DirectoryError> {
    match map.get_mut(&id) {
        Some(existing) => {
            *existing = record;
            Ok(())
        }
        None => Err(DirectoryError::not_found(entity, id)),
    }
}

#[async_trait]
impl RealmRepository for MemoryDirectory {
    async fn list_realms(&self, scope: &Principal) -> Result<Vec<Realm>, DirectoryError> {
        let tables = self.read()?;
        let mut realms: Vec<Realm> = tables
            .realms
            .values()
            .filter(|r| scope.matches(&r.id, None))
            .cloned()
            .collect();
        realms.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(realms)
    }

    async fn get_realm(&self, id: &str) -> Result<Realm, DirectoryError> {
        self.read()?
            .realms
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("realm", id))
    }

    async fn realm_by_code(&self, code: &str) -> Result<Realm, DirectoryError> {
        self.read()?
            .realms
            .values()
            .find(|r| r.code == code)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("realm", code))
    }

    async fn insert_realm(&self, realm: Realm) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        if tables.realms.values().any(|r| r.code == realm.code) {
            return Err(DirectoryError::validation(format!(
                "realm code '{}' is already in use",
                realm.code
            )));
        }
        insert_new(&mut tables.realms, "realm", realm.id.clone(), realm)
    }

    async fn update_realm(&self, realm: Realm) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        replace(&mut tables.realms, "realm", realm.id.clone(), realm)
    }

    async fn delete_realm(&self, id: &str) -> Result<(), DirectoryError> {
        self.write()?
            .realms
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::not_found("realm", id))
    }
}

#[async_trait]
impl ProviderRepository for MemoryDirectory {
    async fn list_providers(&self, scope: &Principal) -> Result<Vec<Provider>, DirectoryError> {
        let tables = self.read()?;
        let mut providers: Vec<Provider> = tables
            .providers
            .values()
            .filter(|p| scope.matches(&p.realm_id, None))
            .cloned()
            .collect();
        providers.sort_by(|a, b| (&a.realm_id, &a.code).cmp(&(&b.realm_id, &b.code)));
        Ok(providers)
    }

    async fn get_provider(&self, realm_id: &str, id: &str) -> Result<Provider, DirectoryError> {
        self.read()?
            .providers
            .get(id)
            .filter(|p| p.realm_id == realm_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("provider", id))
    }

    async fn provider_by_code(
        &self,
        realm_id: &str,
        code: &str,
    ) -> Result<Provider, DirectoryError> {
        self.read()?
            .providers
            .values()
            .find(|p| p.realm_id == realm_id && p.code == code)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("provider", code))
    }

    async fn insert_provider(&self, provider: Provider) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        if tables
            .providers
            .values()
            .any(|p| p.realm_id == provider.realm_id && p.code == provider.code)
        {
            return Err(DirectoryError::validation(format!(
                "provider code '{}' is already in use",
                provider.code
            )));
        }
        insert_new(&mut tables.providers, "provider", provider.id.clone(), provider)
    }

    async fn update_provider(&self, provider: Provider) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        replace(&mut tables.providers, "provider", provider.id.clone(), provider)
    }

    async fn delete_provider(&self, realm_id: &str, id: &str) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        if !tables.providers.get(id).is_some_and(|p| p.realm_id == realm_id) {
            return Err(DirectoryError::not_found("provider", id));
        }
        tables.providers.remove(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryDirectory {
    async fn list_users(&self, scope: &Principal) -> Result<Vec<User>, DirectoryError> {
        let tables = self.read()?;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| scope.matches(&u.realm_id, Some(&u.id)))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn get_user(&self, realm_id: &str, id: &str) -> Result<User, DirectoryError> {
        self.read()?
            .users
            .get(id)
            .filter(|u| u.realm_id == realm_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("user", id))
    }

    async fn user_by_bind_id(&self, realm_id: &str, bind_id: &str) -> Result<User, DirectoryError> {
        self.read()?
            .users
            .values()
            .find(|u| u.realm_id == realm_id && u.bind_id == bind_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("user", bind_id))
    }

    async fn insert_user(&self, user: User) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.realm_id == user.realm_id && u.bind_id == user.bind_id)
        {
            return Err(DirectoryError::validation(format!(
                "bind_id '{}' is already in use",
                user.bind_id
            )));
        }
        insert_new(&mut tables.users, "user", user.id.clone(), user)
    }

    async fn update_user(&self, user: User) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        replace(&mut tables.users, "user", user.id.clone(), user)
    }

    async fn delete_user(&self, realm_id: &str, id: &str) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        if !tables.users.get(id).is_some_and(|u| u.realm_id == realm_id) {
            return Err(DirectoryError::not_found("user", id));
        }
        tables.users.remove(id);
        Ok(())
    }
}

#[async_trait]
impl DaemonRepository for MemoryDirectory {
    async fn list_daemons(&self, scope: &Principal) -> Result<Vec<Daemon>, DirectoryError> {
        let tables = self.read()?;
        let mut daemons: Vec<Daemon> = tables
            .daemons
            .values()
            .filter(|d| scope.matches(&d.realm_id, None))
            .cloned()
            .collect();
        daemons.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(daemons)
    }

    async fn get_daemon(&self, realm_id: &str, id: &str) -> Result<Daemon, DirectoryError> {
        self.read()?
            .daemons
            .get(id)
            .filter(|d| d.realm_id == realm_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("daemon", id))
    }

    async fn insert_daemon(&self, daemon: Daemon) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        insert_new(&mut tables.daemons, "daemon", daemon.id.clone(), daemon)
    }

    async fn update_daemon(&self, daemon: Daemon) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        replace(&mut tables.daemons, "daemon", daemon.id.clone(), daemon)
    }

    async fn delete_daemon(&self, realm_id: &str, id: &str) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        if !tables.daemons.get(id).is_some_and(|d| d.realm_id == realm_id) {
            return Err(DirectoryError::not_found("daemon", id));
        }
        tables.daemons.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for MemoryDirectory {
    async fn api_key_by_value(&self, realm_id: &str, value: &str) -> Result<ApiKey, DirectoryError> {
        self.read()?
            .api_keys
            .values()
            .find(|k| k.realm_id == realm_id && k.value == value)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("api key", "<redacted>"))
    }

    async fn insert_api_key(&self, key: ApiKey) -> Result<(), DirectoryError> {
        let mut tables = self.write()?;
        insert_new(&mut tables.api_keys, "api key", key.id.clone(), key)
    }
}

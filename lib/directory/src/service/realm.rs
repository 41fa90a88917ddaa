//! Realm (application) administration.
//!
//! Creating and deleting realms is a system operation. Realm admins may read
//! and update only the realm they belong to.

use super::{check, require};
use crate::error::DirectoryError;
use crate::model::{NewRealm, Realm, RealmUpdate};
use crate::repository::RealmRepository;
use chrono::Utc;
use gatehouse_access::{Actor, Scope};
use gatehouse_core::IdGenerator;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, instrument};

/// Role-enforced operations on realm records.
#[derive(Clone)]
pub struct RealmService {
    realms: Arc<dyn RealmRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl RealmService {
    /// Creates a new realm service.
    #[must_use]
    pub fn new(realms: Arc<dyn RealmRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { realms, ids }
    }

    /// Lists the realms visible to `actor`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn list_realms(&self, actor: &Actor) -> Result<Vec<Realm>, Report<DirectoryError>> {
        check(actor, actor.realm_id(), "list realms", Scope::Realm)?;
        Ok(self.realms.list_realms(&actor.principal()).await?)
    }

    /// Gets a realm by ID.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn get_realm(&self, actor: &Actor, id: &str) -> Result<Realm, Report<DirectoryError>> {
        check(actor, id, "get realm", Scope::Realm)?;
        Ok(self.realms.get_realm(id).await?)
    }

    /// Creates a realm. Codes are globally unique.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id(), code = %input.code))]
    pub async fn create_realm(
        &self,
        actor: &Actor,
        input: NewRealm,
    ) -> Result<Realm, Report<DirectoryError>> {
        check(actor, actor.realm_id(), "create realm", Scope::System)?;
        require("code", &input.code)?;
        require("name", &input.name)?;

        let now = Utc::now();
        let realm = Realm {
            id: self.ids.generate_id(),
            code: input.code,
            name: input.name,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        self.realms.insert_realm(realm.clone()).await?;

        info!(realm_id = %realm.id, "realm created");
        Ok(realm)
    }

    /// Updates a realm's name or enabled flag.
    #[instrument(skip(self, actor, update), fields(actor = %actor.user_id()))]
    pub async fn update_realm(
        &self,
        actor: &Actor,
        id: &str,
        update: RealmUpdate,
    ) -> Result<Realm, Report<DirectoryError>> {
        check(actor, id, "update realm", Scope::Realm)?;

        let mut realm = self.realms.get_realm(id).await?;
        if let Some(name) = update.name {
            require("name", &name)?;
            realm.name = name;
        }
        if let Some(enabled) = update.enabled {
            realm.enabled = enabled;
        }
        realm.updated_at = Utc::now();
        self.realms.update_realm(realm.clone()).await?;

        info!(realm_id = %id, "realm updated");
        Ok(realm)
    }

    /// Deletes a realm.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn delete_realm(&self, actor: &Actor, id: &str) -> Result<(), Report<DirectoryError>> {
        check(actor, id, "delete realm", Scope::System)?;
        self.realms.delete_realm(id).await?;
        info!(realm_id = %id, "realm deleted");
        Ok(())
    }
}

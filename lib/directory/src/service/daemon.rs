//! Daemon administration.

use super::{check, check_grant, require};
use crate::error::DirectoryError;
use crate::model::{Daemon, DaemonUpdate, NewDaemon};
use crate::repository::DaemonRepository;
use chrono::Utc;
use gatehouse_access::{Actor, Scope};
use gatehouse_core::IdGenerator;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, instrument};

/// Role-enforced operations on daemon records.
#[derive(Clone)]
pub struct DaemonService {
    daemons: Arc<dyn DaemonRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl DaemonService {
    /// Creates a new daemon service.
    #[must_use]
    pub fn new(daemons: Arc<dyn DaemonRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { daemons, ids }
    }

    /// Lists the daemons visible to `actor`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn list_daemons(&self, actor: &Actor) -> Result<Vec<Daemon>, Report<DirectoryError>> {
        check(actor, actor.realm_id(), "list daemons", Scope::Realm)?;
        Ok(self.daemons.list_daemons(&actor.principal()).await?)
    }

    /// Gets a daemon.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn get_daemon(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
    ) -> Result<Daemon, Report<DirectoryError>> {
        check(actor, realm_id, "get daemon", Scope::Realm)?;
        Ok(self.daemons.get_daemon(realm_id, id).await?)
    }

    /// Creates a daemon in `realm_id` with a generated ID.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id()))]
    pub async fn create_daemon(
        &self,
        actor: &Actor,
        realm_id: &str,
        input: NewDaemon,
    ) -> Result<Daemon, Report<DirectoryError>> {
        check(actor, realm_id, "create daemon", Scope::Realm)?;
        check_grant(actor, input.role)?;
        require("name", &input.name)?;

        let now = Utc::now();
        let daemon = Daemon {
            id: self.ids.generate_id(),
            realm_id: realm_id.to_string(),
            name: input.name,
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        self.daemons.insert_daemon(daemon.clone()).await?;

        info!(daemon_id = %daemon.id, realm_id = %realm_id, "daemon created");
        Ok(daemon)
    }

    /// Updates a daemon.
    #[instrument(skip(self, actor, update), fields(actor = %actor.user_id()))]
    pub async fn update_daemon(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
        update: DaemonUpdate,
    ) -> Result<Daemon, Report<DirectoryError>> {
        check(actor, realm_id, "update daemon", Scope::Realm)?;
        if let Some(role) = update.role {
            check_grant(actor, role)?;
        }

        let mut daemon = self.daemons.get_daemon(realm_id, id).await?;
        if let Some(name) = update.name {
            require("name", &name)?;
            daemon.name = name;
        }
        if let Some(role) = update.role {
            daemon.role = role;
        }
        daemon.updated_at = Utc::now();
        self.daemons.update_daemon(daemon.clone()).await?;

        info!(daemon_id = %id, realm_id = %realm_id, "daemon updated");
        Ok(daemon)
    }

    /// Deletes a daemon.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn delete_daemon(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
    ) -> Result<(), Report<DirectoryError>> {
        check(actor, realm_id, "delete daemon", Scope::Realm)?;
        self.daemons.delete_daemon(realm_id, id).await?;
        info!(daemon_id = %id, realm_id = %realm_id, "daemon deleted");
        Ok(())
    }
}

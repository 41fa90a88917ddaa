//! User administration.

use super::{check, check_grant, require};
use crate::error::DirectoryError;
use crate::model::{NewUser, User, UserUpdate};
use crate::repository::UserRepository;
use chrono::Utc;
use gatehouse_access::{Actor, Scope};
use gatehouse_core::IdGenerator;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, instrument};

/// Role-enforced operations on user records.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { users, ids }
    }

    /// Lists the users visible to `actor`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, Report<DirectoryError>> {
        check(actor, actor.realm_id(), "list users", Scope::Realm)?;
        Ok(self.users.list_users(&actor.principal()).await?)
    }

    /// Gets a user. Narrow actors may only read their own record.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn get_user(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
    ) -> Result<User, Report<DirectoryError>> {
        check(actor, realm_id, "get user", Scope::SelfRecord(id))?;
        Ok(self.users.get_user(realm_id, id).await?)
    }

    /// Creates a user in `realm_id` with a generated ID.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id()))]
    pub async fn create_user(
        &self,
        actor: &Actor,
        realm_id: &str,
        input: NewUser,
    ) -> Result<User, Report<DirectoryError>> {
        check(actor, realm_id, "create user", Scope::Realm)?;
        check_grant(actor, input.role)?;
        require("bind_id", &input.bind_id)?;

        let now = Utc::now();
        let user = User {
            id: self.ids.generate_id(),
            realm_id: realm_id.to_string(),
            bind_id: input.bind_id,
            display_name: input.display_name,
            email: input.email,
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert_user(user.clone()).await?;

        info!(user_id = %user.id, realm_id = %realm_id, "user created");
        Ok(user)
    }

    /// Updates a user. Narrow actors may update their own profile but never
    /// their role, and no actor may modify a user holding a higher role.
    #[instrument(skip(self, actor, update), fields(actor = %actor.user_id()))]
    pub async fn update_user(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
        update: UserUpdate,
    ) -> Result<User, Report<DirectoryError>> {
        check(actor, realm_id, "update user", Scope::SelfRecord(id))?;
        if let Some(role) = update.role {
            check(actor, realm_id, "change user role", Scope::Realm)?;
            check_grant(actor, role)?;
        }

        let mut user = self.users.get_user(realm_id, id).await?;
        check_grant(actor, user.role)?;
        if let Some(display_name) = update.display_name {
            user.display_name = Some(display_name);
        }
        if let Some(email) = update.email {
            user.email = Some(email);
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        self.users.update_user(user.clone()).await?;

        info!(user_id = %id, realm_id = %realm_id, "user updated");
        Ok(user)
    }

    /// Deletes a user. Actors cannot delete users holding a role above their
    /// own.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn delete_user(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
    ) -> Result<(), Report<DirectoryError>> {
        check(actor, realm_id, "delete user", Scope::Realm)?;
        let user = self.users.get_user(realm_id, id).await?;
        check_grant(actor, user.role)?;
        self.users.delete_user(realm_id, id).await?;
        info!(user_id = %id, realm_id = %realm_id, "user deleted");
        Ok(())
    }
}

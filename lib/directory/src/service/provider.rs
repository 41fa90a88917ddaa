//! OAuth provider administration.

use super::{check, require};
use crate::error::DirectoryError;
use crate::model::{NewProvider, Provider, ProviderKind, ProviderUpdate};
use crate::repository::ProviderRepository;
use chrono::Utc;
use gatehouse_access::{Actor, Scope};
use gatehouse_core::IdGenerator;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, instrument};

/// Role-enforced operations on provider records.
#[derive(Clone)]
pub struct ProviderService {
    providers: Arc<dyn ProviderRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl ProviderService {
    /// Creates a new provider service.
    #[must_use]
    pub fn new(providers: Arc<dyn ProviderRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { providers, ids }
    }

    /// Lists the providers visible to `actor`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn list_providers(
        &self,
        actor: &Actor,
    ) -> Result<Vec<Provider>, Report<DirectoryError>> {
        check(actor, actor.realm_id(), "list providers", Scope::Realm)?;
        Ok(self.providers.list_providers(&actor.principal()).await?)
    }

    /// Gets a provider.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn get_provider(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
    ) -> Result<Provider, Report<DirectoryError>> {
        check(actor, realm_id, "get provider", Scope::Realm)?;
        Ok(self.providers.get_provider(realm_id, id).await?)
    }

    /// Creates a provider in `realm_id`. Codes are unique within a realm and
    /// the type must have a registered implementation.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id(), code = %input.code))]
    pub async fn create_provider(
        &self,
        actor: &Actor,
        realm_id: &str,
        input: NewProvider,
    ) -> Result<Provider, Report<DirectoryError>> {
        check(actor, realm_id, "create provider", Scope::Realm)?;
        require("code", &input.code)?;
        let provider_type: ProviderKind = input.provider_type.parse()?;
        require("client_id", &input.client_id)?;
        require("redirect_url", &input.redirect_url)?;

        let now = Utc::now();
        let provider = Provider {
            id: self.ids.generate_id(),
            realm_id: realm_id.to_string(),
            code: input.code,
            provider_type: provider_type.to_string(),
            client_id: input.client_id,
            client_secret: input.client_secret,
            redirect_url: input.redirect_url,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        self.providers.insert_provider(provider.clone()).await?;

        info!(provider_id = %provider.id, realm_id = %realm_id, "provider created");
        Ok(provider)
    }

    /// Updates a provider's client settings or enabled flag.
    #[instrument(skip(self, actor, update), fields(actor = %actor.user_id()))]
    pub async fn update_provider(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
        update: ProviderUpdate,
    ) -> Result<Provider, Report<DirectoryError>> {
        check(actor, realm_id, "update provider", Scope::Realm)?;

        let mut provider = self.providers.get_provider(realm_id, id).await?;
        if let Some(client_id) = update.client_id {
            require("client_id", &client_id)?;
            provider.client_id = client_id;
        }
        if let Some(client_secret) = update.client_secret {
            provider.client_secret = client_secret;
        }
        if let Some(redirect_url) = update.redirect_url {
            require("redirect_url", &redirect_url)?;
            provider.redirect_url = redirect_url;
        }
        if let Some(enabled) = update.enabled {
            provider.enabled = enabled;
        }
        provider.updated_at = Utc::now();
        self.providers.update_provider(provider.clone()).await?;

        info!(provider_id = %id, realm_id = %realm_id, "provider updated");
        Ok(provider)
    }

    /// Deletes a provider.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn delete_provider(
        &self,
        actor: &Actor,
        realm_id: &str,
        id: &str,
    ) -> Result<(), Report<DirectoryError>> {
        check(actor, realm_id, "delete provider", Scope::Realm)?;
        self.providers.delete_provider(realm_id, id).await?;
        info!(provider_id = %id, realm_id = %realm_id, "provider deleted");
        Ok(())
    }
}

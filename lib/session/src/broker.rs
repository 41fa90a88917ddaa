//! The session broker.
//!
//! Sessions move through Pending (created by `provider_link`), Active
//! (completed by `login`, rotated by `refresh`), and Deleted (`logout`, a
//! provider failure, or TTL eviction). The broker is the only writer of
//! session records and holds no mutable state of its own.

use crate::cache::SessionCache;
use crate::error::{BrokerError, ProviderError};
use crate::model::{OAuthConfig, OAuthState, UserInfo, UserSession, session_key};
use crate::oauth::{OAuthProvider, ProviderFactory, provider_kind};
use chrono::Utc;
use gatehouse_core::IdGenerator;
use gatehouse_directory::{Lookup, User};
use oauth2::PkceCodeChallenge;
use rootcause::prelude::Report;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default bound on each cache or provider call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    /// TTL applied whenever a session is written.
    pub session_ttl: Duration,
    /// Bound on each cache or provider call.
    pub call_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Outcome of a completed login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub session_id: String,
    pub action: String,
    pub user_info: UserInfo,
}

/// Orchestrates login, refresh, logout, and API key verification.
#[derive(Clone)]
pub struct SessionBroker {
    lookup: Arc<dyn Lookup>,
    cache: Arc<dyn SessionCache>,
    providers: Arc<dyn ProviderFactory>,
    ids: Arc<dyn IdGenerator>,
    config: BrokerConfig,
}

impl SessionBroker {
    /// Creates a broker over its collaborators.
    #[must_use]
    pub fn new(
        lookup: Arc<dyn Lookup>,
        cache: Arc<dyn SessionCache>,
        providers: Arc<dyn ProviderFactory>,
        ids: Arc<dyn IdGenerator>,
        config: BrokerConfig,
    ) -> Self {
        Self {
            lookup,
            cache,
            providers,
            ids,
            config,
        }
    }

    /// Returns the broker configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Starts a login flow: stores a Pending session and returns the
    /// provider's authorization URL with `state = "{action}:{session_id}"`.
    #[instrument(skip(self))]
    pub async fn provider_link(
        &self,
        realm_code: &str,
        provider_code: &str,
        action: Option<&str>,
    ) -> Result<String, Report<BrokerError>> {
        if action.is_some_and(|a| a.contains(':')) {
            return Err(BrokerError::BadRequest {
                reason: "action must not contain ':'".to_string(),
            }
            .into());
        }

        let realm = self
            .lookup
            .lookup_realm(realm_code)
            .await
            .map_err(BrokerError::from)?;
        if !realm.enabled {
            return Err(BrokerError::access_denied(format!("realm '{realm_code}' is disabled")).into());
        }

        let provider = self
            .lookup
            .lookup_provider(&realm.id, provider_code)
            .await
            .map_err(BrokerError::from)?;
        if !provider.enabled {
            return Err(BrokerError::access_denied(format!(
                "provider '{provider_code}' is disabled"
            ))
            .into());
        }

        let oauth_config = OAuthConfig {
            provider_type: provider_kind(&provider.provider_type)?,
            client_id: provider.client_id,
            client_secret: provider.client_secret,
            redirect_url: provider.redirect_url,
        };

        let session_id = self.ids.generate_id();
        let oauth = self.instantiate(&oauth_config)?;
        let (_, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let pkce_verifier = pkce_verifier.secret().to_string();
        self.store(
            &session_id,
            &UserSession::pending(realm.id, oauth_config, pkce_verifier.as_str()),
        )
        .await?;

        info!(session_id = %session_id, "pending session created");
        let state = OAuthState::new(action, session_id.as_str());
        Ok(oauth.auth_url(&state.to_string(), &pkce_verifier))
    }

    /// Completes a login flow started by `provider_link`.
    ///
    /// The provider is rebuilt from the config stored in the Pending
    /// session, never from request input.
    #[instrument(skip(self, code, state))]
    pub async fn login(&self, code: &str, state: &str) -> Result<LoginResult, Report<BrokerError>> {
        if code.is_empty() || state.is_empty() {
            return Err(BrokerError::BadRequest {
                reason: "code and state are required".to_string(),
            }
            .into());
        }

        let state = OAuthState::parse(state);
        let session_id = state.session_id.as_str();

        let Some(mut session) = self.load(session_id).await? else {
            warn!(session_id = %session_id, "login for unknown session");
            return Err(BrokerError::access_denied("unknown login state").into());
        };
        if !session.is_pending() {
            warn!(session_id = %session_id, "login replayed against completed session");
            return Err(BrokerError::access_denied("login already completed").into());
        }

        let Some(pkce_verifier) = session.pkce_verifier.clone() else {
            warn!(session_id = %session_id, "pending session has no PKCE verifier");
            return Err(BrokerError::access_denied("unknown login state").into());
        };
        let oauth = self.instantiate(&session.oauth_config)?;

        let token = match self
            .call_provider("authorize", oauth.authorize(code, &pkce_verifier))
            .await
        {
            Ok(token) => token,
            Err(err) => return Err(self.abandon(session_id, &err).await.into()),
        };
        let user_info = match self.call_provider("user info", oauth.user_info(&token)).await {
            Ok(user_info) => user_info,
            Err(err) => return Err(self.abandon(session_id, &err).await.into()),
        };

        session.activate(token, user_info.clone());
        self.store(session_id, &session).await?;

        info!(session_id = %session_id, realm_id = %session.realm_id, "session activated");
        Ok(LoginResult {
            session_id: session_id.to_string(),
            action: state.action.clone(),
            user_info,
        })
    }

    /// Returns an Active session. Pending sessions are not visible.
    #[instrument(skip(self))]
    pub async fn session(&self, session_id: &str) -> Result<UserSession, Report<BrokerError>> {
        Ok(self.load_active(session_id).await?)
    }

    /// Returns an Active session together with the directory user bound to
    /// its profile.
    #[instrument(skip(self))]
    pub async fn session_user(
        &self,
        session_id: &str,
    ) -> Result<(UserSession, User), Report<BrokerError>> {
        let session = self.load_active(session_id).await?;
        let bind_id = session
            .user_info
            .as_ref()
            .map(|info| info.bind_id.as_str())
            .ok_or_else(|| BrokerError::session_not_found(session_id))?;

        let user = self
            .lookup
            .user_by_bind_id(&session.realm_id, bind_id)
            .await
            .map_err(BrokerError::from)?;
        Ok((session, user))
    }

    /// Refreshes the session's access token.
    ///
    /// Returns `false` without writing when the provider hands back the same
    /// access token.
    #[instrument(skip(self))]
    pub async fn refresh(&self, session_id: &str) -> Result<bool, Report<BrokerError>> {
        let mut session = self.load_active(session_id).await?;
        let Some(token) = session.token.clone() else {
            return Err(BrokerError::session_not_found(session_id).into());
        };

        let oauth = self.instantiate(&session.oauth_config)?;
        let refreshed = match self
            .call_provider("refresh", oauth.refresh_access_token(&token))
            .await
        {
            Ok(refreshed) => refreshed,
            Err(err) => return Err(self.abandon(session_id, &err).await.into()),
        };

        if refreshed.access_token == token.access_token {
            debug!(session_id = %session_id, "provider returned the same access token");
            return Ok(false);
        }

        session.token = Some(refreshed);
        session.last_updated = Utc::now();
        self.store(session_id, &session).await?;

        info!(session_id = %session_id, "session token refreshed");
        Ok(true)
    }

    /// Ends a session. The session is deleted before the token is revoked,
    /// so a failed revocation still leaves no session behind.
    #[instrument(skip(self))]
    pub async fn logout(&self, session_id: &str) -> Result<(), Report<BrokerError>> {
        let session = self.load_active(session_id).await?;
        self.remove(session_id).await?;
        info!(session_id = %session_id, "session deleted");

        let Some(token) = session.token else {
            return Ok(());
        };
        let oauth = self.instantiate(&session.oauth_config)?;
        self.call_provider("revoke", oauth.revoke_access_token(&token))
            .await
            .map_err(|err| {
                warn!(session_id = %session_id, error = %err, "token revocation failed");
                BrokerError::access_denied("token revocation failed")
            })?;
        Ok(())
    }

    /// Verifies a daemon API key for a realm. Session state is not touched.
    #[instrument(skip(self, api_key))]
    pub async fn verify_api_key(
        &self,
        realm_id: &str,
        api_key: &str,
    ) -> Result<(), Report<BrokerError>> {
        self.lookup
            .lookup_api_key(realm_id, api_key)
            .await
            .map_err(|err| {
                debug!(realm_id = %realm_id, error = %err, "api key rejected");
                BrokerError::from(err)
            })?;
        Ok(())
    }

    fn instantiate(&self, config: &OAuthConfig) -> Result<Arc<dyn OAuthProvider>, BrokerError> {
        self.providers.create(config).map_err(|err| {
            warn!(provider_type = %config.provider_type, error = %err, "provider unavailable");
            BrokerError::Validation {
                reason: err.to_string(),
            }
        })
    }

    async fn call_provider<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout { operation }),
        }
    }

    /// Deletes a session after a provider failure and returns the error to
    /// surface. A failed delete is logged, not returned.
    async fn abandon(&self, session_id: &str, err: &ProviderError) -> BrokerError {
        warn!(session_id = %session_id, error = %err, "provider call failed, deleting session");
        if let Err(delete_err) = self.remove(session_id).await {
            warn!(session_id = %session_id, error = %delete_err, "failed to delete session");
        }
        BrokerError::access_denied("identity provider rejected the request")
    }

    async fn load(&self, session_id: &str) -> Result<Option<UserSession>, BrokerError> {
        let key = session_key(session_id);
        let bytes = timeout(self.config.call_timeout, self.cache.get(&key))
            .await
            .map_err(|_| BrokerError::Timeout {
                operation: "cache get",
            })??;

        match bytes {
            Some(bytes) => Ok(Some(UserSession::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_active(&self, session_id: &str) -> Result<UserSession, BrokerError> {
        match self.load(session_id).await? {
            Some(session) if session.is_active() => Ok(session),
            _ => Err(BrokerError::session_not_found(session_id)),
        }
    }

    async fn store(&self, session_id: &str, session: &UserSession) -> Result<(), BrokerError> {
        let key = session_key(session_id);
        let value = session.encode()?;
        timeout(
            self.config.call_timeout,
            self.cache.put(&key, value, self.config.session_ttl),
        )
        .await
        .map_err(|_| BrokerError::Timeout {
            operation: "cache put",
        })??;
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), BrokerError> {
        let key = session_key(session_id);
        timeout(self.config.call_timeout, self.cache.delete(&key))
            .await
            .map_err(|_| BrokerError::Timeout {
                operation: "cache delete",
            })??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::CacheError;
    use crate::model::OAuthToken;
    use async_trait::async_trait;
    use gatehouse_directory::{
        ApiKey, DirectorySeed, MemoryDirectory, Provider, Realm, RepositoryLookup,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeProvider {
        fail_authorize: bool,
        fail_user_info: bool,
        fail_refresh: bool,
        fail_revoke: bool,
        hang_authorize: bool,
        refreshed_access_token: Option<&'static str>,
        revoked: Mutex<Vec<String>>,
        linked_verifiers: Mutex<Vec<String>>,
        exchanged_verifiers: Mutex<Vec<String>>,
    }

    fn rejected() -> ProviderError {
        ProviderError::TokenExchange {
            details: "rejected".to_string(),
        }
    }

    #[async_trait]
    impl OAuthProvider for FakeProvider {
        fn auth_url(&self, state: &str, pkce_verifier: &str) -> String {
            self.linked_verifiers
                .lock()
                .expect("lock")
                .push(pkce_verifier.to_string());
            format!("https://idp.test/auth?client_id=client&state={state}")
        }

        async fn authorize(
            &self,
            code: &str,
            pkce_verifier: &str,
        ) -> Result<OAuthToken, ProviderError> {
            self.exchanged_verifiers
                .lock()
                .expect("lock")
                .push(pkce_verifier.to_string());
            if self.hang_authorize {
                std::future::pending::<()>().await;
            }
            if self.fail_authorize {
                return Err(rejected());
            }
            Ok(OAuthToken {
                access_token: format!("at-{code}"),
                refresh_token: Some("rt".to_string()),
                expires_at: None,
            })
        }

        async fn refresh_access_token(
            &self,
            token: &OAuthToken,
        ) -> Result<OAuthToken, ProviderError> {
            if self.fail_refresh {
                return Err(rejected());
            }
            Ok(OAuthToken {
                access_token: self
                    .refreshed_access_token
                    .map_or_else(|| token.access_token.clone(), str::to_string),
                refresh_token: token.refresh_token.clone(),
                expires_at: None,
            })
        }

        async fn revoke_access_token(&self, token: &OAuthToken) -> Result<(), ProviderError> {
            self.revoked
                .lock()
                .expect("lock")
                .push(token.access_token.clone());
            if self.fail_revoke {
                return Err(ProviderError::Revoke {
                    details: "revoke endpoint returned 500".to_string(),
                });
            }
            Ok(())
        }

        async fn user_info(&self, _token: &OAuthToken) -> Result<UserInfo, ProviderError> {
            if self.fail_user_info {
                return Err(ProviderError::UserInfo {
                    details: "userinfo endpoint returned 401".to_string(),
                });
            }
            Ok(UserInfo {
                provider_user_id: "1234".to_string(),
                bind_id: "alice@acme.test".to_string(),
                display_name: Some("Alice".to_string()),
                email: Some("alice@acme.test".to_string()),
                ..UserInfo::default()
            })
        }
    }

    struct FakeFactory {
        provider: Arc<FakeProvider>,
        created: Mutex<Vec<OAuthConfig>>,
    }

    impl ProviderFactory for FakeFactory {
        fn create(&self, config: &OAuthConfig) -> Result<Arc<dyn OAuthProvider>, ProviderError> {
            self.created.lock().expect("lock").push(config.clone());
            let provider: Arc<dyn OAuthProvider> = self.provider.clone();
            Ok(provider)
        }
    }

    #[derive(Default)]
    struct CountingCache {
        inner: MemoryCache,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl SessionCache for CountingCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key).await
        }
    }

    struct HangingCache;

    #[async_trait]
    impl SessionCache for HangingCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            std::future::pending().await
        }

        async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct SequentialIds {
        next: AtomicUsize,
    }

    impl IdGenerator for SequentialIds {
        fn generate_id(&self) -> String {
            format!("ses_{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn provider_record(id: &str, code: &str, provider_type: &str, enabled: bool) -> Provider {
        Provider {
            id: id.to_string(),
            realm_id: "rlm_acme".to_string(),
            code: code.to_string(),
            provider_type: provider_type.to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "https://acme.test/auth/callback".to_string(),
            enabled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::from_seed(DirectorySeed {
            realms: vec![Realm {
                id: "rlm_acme".to_string(),
                code: "acme".to_string(),
                name: "Acme".to_string(),
                enabled: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
            providers: vec![
                provider_record("prv_1", "google", "google", true),
                provider_record("prv_2", "okta", "okta", true),
                provider_record("prv_3", "legacy", "google", false),
            ],
            users: vec![User {
                id: "usr_alice".to_string(),
                realm_id: "rlm_acme".to_string(),
                bind_id: "alice@acme.test".to_string(),
                display_name: Some("Alice".to_string()),
                email: Some("alice@acme.test".to_string()),
                role: gatehouse_access::Role::User,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
            api_keys: vec![ApiKey {
                id: "key_1".to_string(),
                realm_id: "rlm_acme".to_string(),
                daemon_id: "dmn_1".to_string(),
                value: "k-live".to_string(),
                enabled: true,
                expires_at: None,
            }],
            ..DirectorySeed::default()
        })
    }

    struct Harness {
        broker: SessionBroker,
        provider: Arc<FakeProvider>,
        factory: Arc<FakeFactory>,
        cache: Arc<CountingCache>,
    }

    fn harness_with(provider: FakeProvider, call_timeout: Duration) -> Harness {
        let provider = Arc::new(provider);
        let factory = Arc::new(FakeFactory {
            provider: Arc::clone(&provider),
            created: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(CountingCache::default());
        let broker = SessionBroker::new(
            Arc::new(RepositoryLookup::new(Arc::new(directory()))),
            cache.clone(),
            factory.clone(),
            Arc::new(SequentialIds::default()),
            BrokerConfig {
                session_ttl: DEFAULT_SESSION_TTL,
                call_timeout,
            },
        );
        Harness {
            broker,
            provider,
            factory,
            cache,
        }
    }

    fn harness(provider: FakeProvider) -> Harness {
        harness_with(provider, DEFAULT_CALL_TIMEOUT)
    }

    fn kind<T: std::fmt::Debug>(result: Result<T, Report<BrokerError>>) -> BrokerError {
        result.unwrap_err().current_context().clone()
    }

    async fn active_session(h: &Harness) -> String {
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");
        h.broker.login("code-1", "login:ses_1").await.expect("login");
        "ses_1".to_string()
    }

    async fn cached(h: &Harness, session_id: &str) -> Option<Vec<u8>> {
        h.cache.get(&session_key(session_id)).await.expect("cache get")
    }

    #[tokio::test]
    async fn provider_link_stores_pending_session() {
        let h = harness(FakeProvider::default());
        let url = h
            .broker
            .provider_link("acme", "google", Some("login"))
            .await
            .expect("link");

        assert!(url.contains("state=login:ses_1"));
        assert!(cached(&h, "ses_1").await.is_some());
        assert!(matches!(
            kind(h.broker.session("ses_1").await),
            BrokerError::NotFound { entity: "session", .. }
        ));
    }

    #[tokio::test]
    async fn provider_link_defaults_action() {
        let h = harness(FakeProvider::default());
        let url = h
            .broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");
        assert!(url.ends_with("state=login:ses_1"));

        let url = h
            .broker
            .provider_link("acme", "google", Some("link"))
            .await
            .expect("link");
        assert!(url.ends_with("state=link:ses_2"));
    }

    #[tokio::test]
    async fn login_exchanges_the_linked_pkce_verifier() {
        let h = harness(FakeProvider::default());
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        let linked = h.provider.linked_verifiers.lock().expect("lock").clone();
        assert_eq!(linked.len(), 2);
        assert!(linked.iter().all(|v| v.len() >= 43));
        assert_ne!(linked[0], linked[1]);

        let pending = UserSession::decode(&cached(&h, "ses_2").await.expect("pending"))
            .expect("decode");
        assert_eq!(pending.pkce_verifier.as_ref(), Some(&linked[1]));

        h.broker.login("code-1", "login:ses_2").await.expect("login");
        let exchanged = h.provider.exchanged_verifiers.lock().expect("lock").clone();
        assert_eq!(exchanged, vec![linked[1].clone()]);

        let active = h.broker.session("ses_2").await.expect("active");
        assert_eq!(active.pkce_verifier, None);
    }

    #[tokio::test]
    async fn provider_link_lookup_failures() {
        let h = harness(FakeProvider::default());

        assert!(matches!(
            kind(h.broker.provider_link("initech", "google", None).await),
            BrokerError::NotFound { entity: "realm", .. }
        ));
        assert!(matches!(
            kind(h.broker.provider_link("acme", "github", None).await),
            BrokerError::NotFound { entity: "provider", .. }
        ));
        assert!(matches!(
            kind(h.broker.provider_link("acme", "legacy", None).await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(matches!(
            kind(h.broker.provider_link("acme", "okta", None).await),
            BrokerError::UnsupportedProvider { .. }
        ));
        assert!(matches!(
            kind(h.broker.provider_link("acme", "google", Some("a:b")).await),
            BrokerError::BadRequest { .. }
        ));
        assert_eq!(h.cache.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_activates_session() {
        let h = harness(FakeProvider::default());
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        let result = h.broker.login("code-1", "login:ses_1").await.expect("login");
        assert_eq!(result.session_id, "ses_1");
        assert_eq!(result.action, "login");
        assert_eq!(result.user_info.bind_id, "alice@acme.test");

        let session = h.broker.session("ses_1").await.expect("active session");
        assert_eq!(session.realm_id, "rlm_acme");
        assert_eq!(
            session.token.map(|t| t.access_token).as_deref(),
            Some("at-code-1")
        );
    }

    #[tokio::test]
    async fn login_uses_stored_config() {
        let h = harness(FakeProvider::default());
        active_session(&h).await;

        let created = h.factory.created.lock().expect("lock");
        assert_eq!(created.len(), 2);
        assert_eq!(created[0], created[1]);
        assert_eq!(created[1].client_id, "client");
    }

    #[tokio::test]
    async fn login_replay_is_denied() {
        let h = harness(FakeProvider::default());
        let session_id = active_session(&h).await;

        assert!(matches!(
            kind(h.broker.login("code-2", "login:ses_1").await),
            BrokerError::AccessDenied { .. }
        ));
        let session = h.broker.session(&session_id).await.expect("still active");
        assert_eq!(
            session.token.map(|t| t.access_token).as_deref(),
            Some("at-code-1")
        );
    }

    #[tokio::test]
    async fn login_state_without_action() {
        let h = harness(FakeProvider::default());
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");
        let result = h.broker.login("code-1", "ses_1").await.expect("login");
        assert_eq!(result.session_id, "ses_1");
        assert_eq!(result.action, "login");
    }

    #[tokio::test]
    async fn login_with_unknown_or_malformed_state() {
        let h = harness(FakeProvider::default());
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        assert!(matches!(
            kind(h.broker.login("code-1", "login:ses_9").await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(matches!(
            kind(h.broker.login("code-1", "x:ses_1:y").await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(matches!(
            kind(h.broker.login("", "login:ses_1").await),
            BrokerError::BadRequest { .. }
        ));
        assert!(cached(&h, "ses_1").await.is_some());
    }

    #[tokio::test]
    async fn authorize_failure_deletes_session() {
        let h = harness(FakeProvider {
            fail_authorize: true,
            ..FakeProvider::default()
        });
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        assert!(matches!(
            kind(h.broker.login("code-1", "login:ses_1").await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(cached(&h, "ses_1").await.is_none());
    }

    #[tokio::test]
    async fn user_info_failure_deletes_session() {
        let h = harness(FakeProvider {
            fail_user_info: true,
            ..FakeProvider::default()
        });
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        assert!(matches!(
            kind(h.broker.login("code-1", "login:ses_1").await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(cached(&h, "ses_1").await.is_none());
    }

    #[tokio::test]
    async fn provider_timeout_is_a_provider_failure() {
        let h = harness_with(
            FakeProvider {
                hang_authorize: true,
                ..FakeProvider::default()
            },
            Duration::from_millis(50),
        );
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        assert!(matches!(
            kind(h.broker.login("code-1", "login:ses_1").await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(cached(&h, "ses_1").await.is_none());
    }

    #[tokio::test]
    async fn cache_timeout_is_reported() {
        let broker = SessionBroker::new(
            Arc::new(RepositoryLookup::new(Arc::new(directory()))),
            Arc::new(HangingCache),
            Arc::new(FakeFactory {
                provider: Arc::new(FakeProvider::default()),
                created: Mutex::new(Vec::new()),
            }),
            Arc::new(SequentialIds::default()),
            BrokerConfig {
                session_ttl: DEFAULT_SESSION_TTL,
                call_timeout: Duration::from_millis(50),
            },
        );
        assert!(matches!(
            kind(broker.session("ses_1").await),
            BrokerError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn refresh_with_same_token_does_not_write() {
        let h = harness(FakeProvider::default());
        let session_id = active_session(&h).await;
        let puts = h.cache.puts.load(Ordering::SeqCst);
        let before = h.broker.session(&session_id).await.expect("session");

        assert!(!h.broker.refresh(&session_id).await.expect("refresh"));
        assert_eq!(h.cache.puts.load(Ordering::SeqCst), puts);
        let after = h.broker.session(&session_id).await.expect("session");
        assert_eq!(after.last_updated, before.last_updated);
    }

    #[tokio::test]
    async fn refresh_with_new_token_writes_back() {
        let h = harness(FakeProvider {
            refreshed_access_token: Some("at-rotated"),
            ..FakeProvider::default()
        });
        let session_id = active_session(&h).await;
        let puts = h.cache.puts.load(Ordering::SeqCst);
        let before = h.broker.session(&session_id).await.expect("session");

        assert!(h.broker.refresh(&session_id).await.expect("refresh"));
        assert_eq!(h.cache.puts.load(Ordering::SeqCst), puts + 1);

        let after = h.broker.session(&session_id).await.expect("session");
        assert!(after.last_updated >= before.last_updated);
        assert_eq!(
            after.token.map(|t| t.access_token).as_deref(),
            Some("at-rotated")
        );
    }

    #[tokio::test]
    async fn refresh_failure_deletes_session() {
        let h = harness(FakeProvider {
            fail_refresh: true,
            ..FakeProvider::default()
        });
        let session_id = active_session(&h).await;

        assert!(matches!(
            kind(h.broker.refresh(&session_id).await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(cached(&h, &session_id).await.is_none());
    }

    #[tokio::test]
    async fn pending_sessions_cannot_refresh_or_logout() {
        let h = harness(FakeProvider::default());
        h.broker
            .provider_link("acme", "google", None)
            .await
            .expect("link");

        assert!(matches!(
            kind(h.broker.refresh("ses_1").await),
            BrokerError::NotFound { .. }
        ));
        assert!(matches!(
            kind(h.broker.logout("ses_1").await),
            BrokerError::NotFound { .. }
        ));
        assert!(cached(&h, "ses_1").await.is_some());
    }

    #[tokio::test]
    async fn logout_deletes_and_revokes() {
        let h = harness(FakeProvider::default());
        let session_id = active_session(&h).await;

        h.broker.logout(&session_id).await.expect("logout");
        assert!(cached(&h, &session_id).await.is_none());
        assert_eq!(
            *h.provider.revoked.lock().expect("lock"),
            vec!["at-code-1".to_string()]
        );

        assert!(matches!(
            kind(h.broker.logout(&session_id).await),
            BrokerError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn logout_removes_session_even_when_revoke_fails() {
        let h = harness(FakeProvider {
            fail_revoke: true,
            ..FakeProvider::default()
        });
        let session_id = active_session(&h).await;

        assert!(matches!(
            kind(h.broker.logout(&session_id).await),
            BrokerError::AccessDenied { .. }
        ));
        assert!(cached(&h, &session_id).await.is_none());
        assert!(matches!(
            kind(h.broker.session(&session_id).await),
            BrokerError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn session_user_resolves_bound_user() {
        let h = harness(FakeProvider::default());
        let session_id = active_session(&h).await;

        let (session, user) = h.broker.session_user(&session_id).await.expect("user");
        assert_eq!(session.realm_id, "rlm_acme");
        assert_eq!(user.id, "usr_alice");
    }

    #[tokio::test]
    async fn verify_api_key_delegates_to_lookup() {
        let h = harness(FakeProvider::default());

        h.broker
            .verify_api_key("rlm_acme", "k-live")
            .await
            .expect("valid key");
        assert!(matches!(
            kind(h.broker.verify_api_key("rlm_acme", "k-wrong").await),
            BrokerError::NotFound { .. }
        ));
        assert!(matches!(
            kind(h.broker.verify_api_key("rlm_other", "k-live").await),
            BrokerError::NotFound { .. }
        ));
        assert_eq!(h.cache.puts.load(Ordering::SeqCst), 0);
    }
}

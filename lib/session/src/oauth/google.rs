//! Google OAuth2 provider.
//!
//! Code exchange and refresh go through the `oauth2` client; revocation and
//! the userinfo call are plain `reqwest` requests. The email address is the
//! bind ID.

use super::OAuthProvider;
use crate::error::ProviderError;
use crate::model::{OAuthConfig, OAuthToken, UserInfo};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse,
    TokenUrl,
};
use serde::Deserialize;
use tracing::debug;

/// Google OAuth authorization URL.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token URL.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth revocation URL.
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Google OpenID Connect userinfo endpoint.
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Scopes that yield a stable subject and the profile claims.
const GOOGLE_SCOPES: &[&str] = &["openid", "email", "profile"];

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Endpoint URLs used by `GoogleProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub userinfo_url: String,
}

impl GoogleEndpoints {
    /// Endpoints rooted at `base`, for pointing the provider at a local
    /// server.
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/auth"),
            token_url: format!("{base}/token"),
            revoke_url: format!("{base}/revoke"),
            userinfo_url: format!("{base}/userinfo"),
        }
    }
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

/// Google identity provider bound to one realm's client settings.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    revoke_url: String,
    userinfo_url: String,
    http: reqwest::Client,
}

impl GoogleProvider {
    /// Creates a provider from a session's OAuth config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any URL is invalid.
    pub fn new(
        config: &OAuthConfig,
        endpoints: &GoogleEndpoints,
        http: reqwest::Client,
    ) -> Result<Self, ProviderError> {
        let auth_url = AuthUrl::new(endpoints.auth_url.clone())
            .map_err(|e| configuration("auth URL", &e))?;
        let token_url = TokenUrl::new(endpoints.token_url.clone())
            .map_err(|e| configuration("token URL", &e))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| configuration("redirect URL", &e))?;

        Ok(Self {
            client_id: ClientId::new(config.client_id.clone()),
            client_secret: ClientSecret::new(config.client_secret.clone()),
            auth_url,
            token_url,
            redirect_url,
            revoke_url: endpoints.revoke_url.clone(),
            userinfo_url: endpoints.userinfo_url.clone(),
            http,
        })
    }

    fn client(&self) -> GoogleClient {
        BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
    }
}

fn configuration(what: &str, err: &impl std::fmt::Display) -> ProviderError {
    ProviderError::Configuration {
        details: format!("invalid {what}: {err}"),
    }
}

fn to_token(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> OAuthToken {
    let expires_at = response
        .expires_in()
        .and_then(|d| TimeDelta::from_std(d).ok())
        .map(|d| Utc::now() + d);

    OAuthToken {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at,
    }
}

/// Claims returned by the userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn auth_url(&self, state: &str, pkce_verifier: &str) -> String {
        let pkce_challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            pkce_verifier.to_string(),
        ));

        let client = self.client();
        let mut request = client
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .set_pkce_challenge(pkce_challenge);

        for scope in GOOGLE_SCOPES {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }

        // Offline access with forced consent so a refresh token is issued.
        let (url, _) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();
        url.to_string()
    }

    async fn authorize(&self, code: &str, pkce_verifier: &str) -> Result<OAuthToken, ProviderError> {
        let client = self.client();
        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| ProviderError::TokenExchange {
                details: e.to_string(),
            })?;

        debug!("authorization code exchanged");
        Ok(to_token(&response, None))
    }

    async fn refresh_access_token(&self, token: &OAuthToken) -> Result<OAuthToken, ProviderError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| ProviderError::Refresh {
                details: "no refresh token".to_string(),
            })?;

        let client = self.client();
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| ProviderError::Refresh {
                details: e.to_string(),
            })?;

        Ok(to_token(&response, Some(refresh_token)))
    }

    async fn revoke_access_token(&self, token: &OAuthToken) -> Result<(), ProviderError> {
        // Revoking the refresh token also invalidates its access tokens.
        let value = token
            .refresh_token
            .as_deref()
            .unwrap_or(&token.access_token);

        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", value)])
            .send()
            .await
            .map_err(|e| ProviderError::Revoke {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Revoke {
                details: format!("revoke endpoint returned {}", response.status()),
            });
        }
        Ok(())
    }

    async fn user_info(&self, token: &OAuthToken) -> Result<UserInfo, ProviderError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::UserInfo {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::UserInfo {
                details: format!("userinfo endpoint returned {}", response.status()),
            });
        }

        let claims: GoogleUserInfo =
            response.json().await.map_err(|e| ProviderError::UserInfo {
                details: e.to_string(),
            })?;

        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProviderError::UserInfo {
                details: "profile has no email address".to_string(),
            })?;

        Ok(UserInfo {
            provider_user_id: claims.sub,
            bind_id: email.clone(),
            display_name: claims.name,
            given_name: claims.given_name,
            family_name: claims.family_name,
            email: Some(email),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::ProviderKind;
    use oauth2::url::Url;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> OAuthConfig {
        OAuthConfig {
            provider_type: ProviderKind::Google,
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            redirect_url: "https://acme.test/auth/callback".to_string(),
        }
    }

    /// A valid RFC 7636 verifier (43 characters).
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    fn provider(base: &str) -> GoogleProvider {
        GoogleProvider::new(&config(), &GoogleEndpoints::with_base(base), reqwest::Client::new())
            .expect("valid provider")
    }

    #[test]
    fn auth_url_carries_state_and_offline_access() {
        let provider = provider("https://idp.test");
        let url = Url::parse(&provider.auth_url("login:ses_1", VERIFIER)).expect("valid URL");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(url.path(), "/auth");
        assert_eq!(param("state").as_deref(), Some("login:ses_1"));
        assert_eq!(param("client_id").as_deref(), Some("client-123"));
        assert_eq!(param("access_type").as_deref(), Some("offline"));
        assert_eq!(param("response_type").as_deref(), Some("code"));
        assert_eq!(
            param("redirect_uri").as_deref(),
            Some("https://acme.test/auth/callback")
        );
        assert!(param("scope").is_some_and(|s| s.contains("email")));
    }

    #[test]
    fn auth_url_carries_pkce_challenge() {
        let url = Url::parse(&provider("https://idp.test").auth_url("login:ses_1", VERIFIER))
            .expect("valid URL");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(param("code_challenge_method").as_deref(), Some("S256"));
        // RFC 7636 appendix B test vector.
        assert_eq!(
            param("code_challenge").as_deref(),
            Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM")
        );
    }

    #[test]
    fn invalid_redirect_url_is_rejected() {
        let mut config = config();
        config.redirect_url = "not a url".to_string();
        let err = GoogleProvider::new(&config, &GoogleEndpoints::default(), reqwest::Client::new())
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[tokio::test]
    async fn authorize_exchanges_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains(format!("code_verifier={VERIFIER}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "rt-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = provider(&server.uri())
            .authorize("the-code", VERIFIER)
            .await
            .expect("exchange");
        assert_eq!(token.access_token, "at-1");
        assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
        assert!(token.expires_at.is_some_and(|t| t > Utc::now()));
    }

    #[tokio::test]
    async fn authorize_failure_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).authorize("bad", VERIFIER).await.unwrap_err();
        assert!(matches!(err, ProviderError::TokenExchange { .. }));
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_token_when_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-2",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let old = OAuthToken {
            access_token: "at-1".to_string(),
            refresh_token: Some("rt-1".to_string()),
            expires_at: None,
        };
        let token = provider(&server.uri())
            .refresh_access_token(&old)
            .await
            .expect("refresh");
        assert_eq!(token.access_token, "at-2");
        assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails() {
        let err = provider("http://127.0.0.1:9")
            .refresh_access_token(&OAuthToken::new("at-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Refresh { .. }));
    }

    #[tokio::test]
    async fn revoke_checks_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token=rt-ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token=rt-bad"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        let mut token = OAuthToken::new("at");
        token.refresh_token = Some("rt-ok".to_string());
        provider.revoke_access_token(&token).await.expect("revoke");

        token.refresh_token = Some("rt-bad".to_string());
        let err = provider.revoke_access_token(&token).await.unwrap_err();
        assert!(matches!(err, ProviderError::Revoke { .. }));
    }

    #[tokio::test]
    async fn user_info_normalizes_claims() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "1234567890",
                "email": "alice@acme.test",
                "email_verified": true,
                "name": "Alice Example",
                "given_name": "Alice",
                "family_name": "Example"
            })))
            .mount(&server)
            .await;

        let info = provider(&server.uri())
            .user_info(&OAuthToken::new("at-1"))
            .await
            .expect("userinfo");
        assert_eq!(info.provider_user_id, "1234567890");
        assert_eq!(info.bind_id, "alice@acme.test");
        assert_eq!(info.display_name.as_deref(), Some("Alice Example"));
        assert_eq!(info.given_name.as_deref(), Some("Alice"));
        assert_eq!(info.family_name.as_deref(), Some("Example"));
    }

    #[tokio::test]
    async fn user_info_without_email_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sub": "1" })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .user_info(&OAuthToken::new("at-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UserInfo { .. }));
    }

    #[tokio::test]
    async fn user_info_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .user_info(&OAuthToken::new("expired"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UserInfo { .. }));
    }
}

//! Session routes: provider links, the OAuth callback, session reads,
//! refresh, logout, and API key verification.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Redirect},
    routing::{get, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use gatehouse_directory::User;
use gatehouse_session::{BrokerError, ProviderKind, UserInfo, UserSession};
use serde::{Deserialize, Serialize};
use time::Duration as TimeDuration;
use tower_http::trace::TraceLayer;

/// Session cookie name.
const SESSION_COOKIE: &str = "session";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/callback", get(callback))
        .route("/auth/{realm}/{provider}", get(provider_link))
        .route("/verify", get(verify))
        .route("/{session_id}", get(session).delete(logout))
        .route("/{session_id}/refresh", put(refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters for starting a login.
#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    action: Option<String>,
}

/// Query parameters for the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

/// Body returned after a completed login.
#[derive(Debug, Serialize)]
struct LoginResponse {
    session_id: String,
    action: String,
    user: UserInfo,
}

/// Session fields safe to return to clients.
#[derive(Debug, Serialize)]
struct SessionView {
    session_id: String,
    realm_id: String,
    provider_type: ProviderKind,
    user_info: Option<UserInfo>,
    token_expires_at: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
}

impl SessionView {
    fn new(session_id: String, session: UserSession) -> Self {
        Self {
            session_id,
            realm_id: session.realm_id,
            provider_type: session.oauth_config.provider_type,
            token_expires_at: session.token.and_then(|t| t.expires_at),
            user_info: session.user_info,
            last_updated: session.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session: SessionView,
    user: User,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    refreshed: bool,
}

/// Redirects to the provider's authorization page.
async fn provider_link(
    State(state): State<AppState>,
    Path((realm, provider)): Path<(String, String)>,
    Query(query): Query<LinkQuery>,
) -> Result<Redirect, ApiError> {
    let url = state
        .broker
        .provider_link(&realm, &provider, query.action.as_deref())
        .await?;
    Ok(Redirect::to(&url))
}

/// Completes a login and sets the session cookie.
async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.broker.login(&query.code, &query.state).await?;

    let max_age = i64::try_from(state.session_ttl.as_secs()).unwrap_or(i64::MAX);
    let cookie = Cookie::build((SESSION_COOKIE, result.session_id.clone()))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(max_age));

    let body = LoginResponse {
        session_id: result.session_id,
        action: result.action,
        user: result.user_info,
    };
    Ok((jar.add(cookie), Json(body)))
}

/// Verifies `Authorization: Bearer base64("{realm_id}:{api_key}")`.
async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let (realm_id, api_key) = parse_api_key_header(&headers)?;
    match state.broker.verify_api_key(&realm_id, &api_key).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(report) => {
            let err = ApiError::from(report);
            match err.kind() {
                BrokerError::NotFound { .. } | BrokerError::AccessDenied { .. } => {
                    Err(ApiError::unauthorized("api key rejected"))
                }
                _ => Err(err),
            }
        }
    }
}

/// Returns the session and the user bound to it.
async fn session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (session, user) = state.broker.session_user(&session_id).await?;
    Ok(Json(SessionResponse {
        session: SessionView::new(session_id, session),
        user,
    }))
}

/// Refreshes the session's access token.
async fn refresh(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refreshed = state.broker.refresh(&session_id).await?;
    Ok(Json(RefreshResponse { refreshed }))
}

/// Ends the session and clears the cookie.
async fn logout(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.broker.logout(&session_id).await?;

    let remove_session = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);
    Ok((jar.add(remove_session), StatusCode::OK))
}

fn parse_api_key_header(headers: &HeaderMap) -> Result<(String, String), ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::bad_request("missing authorization header"))?
        .to_str()
        .map_err(|_| ApiError::bad_request("authorization header is not ASCII"))?;

    let encoded = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::bad_request("authorization header is not a bearer token"))?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::bad_request("bearer token is not base64"))?;
    let decoded =
        String::from_utf8(decoded).map_err(|_| ApiError::bad_request("bearer token is not UTF-8"))?;

    match decoded.split_once(':') {
        Some((realm_id, api_key)) if !realm_id.is_empty() && !api_key.is_empty() => {
            Ok((realm_id.to_string(), api_key.to_string()))
        }
        _ => Err(ApiError::bad_request(
            "bearer token must be base64(\"realm_id:api_key\")",
        )),
    }
}

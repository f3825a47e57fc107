//! Session endpoints for cookie and bearer auth.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use chrono::SecondsFormat;
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    state::{AuthConfig, AuthState},
    types::{SessionResponse, SessionUser},
};
use crate::auth::SessionClaims;

pub const SESSION_COOKIE_NAME: &str = "whatsdesigns_session";

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing or invalid tokens are both "no session".
    let Some(claims) = authenticate_session(&headers, &auth_state) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let Some(expires) = claims.expires_at() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let mut user = SessionUser::from(&claims);
    match auth_state.service().accounts().find_by_id(claims.user_id).await {
        Ok(Some(account)) => user = user.with_account(&account),
        Ok(None) => {
            debug!(user_id = %claims.user_id, "session refers to a missing account");
            return StatusCode::NO_CONTENT.into_response();
        }
        Err(err) => {
            error!("Failed to load account for session: {err}");
        }
    }

    let response = SessionResponse {
        user,
        expires: expires.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn signout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Sessions are stateless; clearing the cookie is all there is to do.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Resolve the caller's session from a bearer token or the session cookie.
pub(crate) fn authenticate_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Option<SessionClaims> {
    let token = extract_session_token(headers)?;
    let claims = auth_state.service().sessions().verify(&token);
    if claims.is_none() {
        debug!("ignoring invalid session token");
    }
    claims
}

/// Build a `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
        headers
    }

    #[test]
    fn cookie_token_is_extracted() {
        let headers = headers(COOKIE, "theme=dark; whatsdesigns_session=abc.def.ghi; other=1");
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = headers(COOKIE, "whatsdesigns_session=from-cookie");
        if let Ok(value) = HeaderValue::from_str("Bearer from-header") {
            headers.insert(AUTHORIZATION, value);
        }
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_values_are_ignored() {
        assert!(extract_session_token(&headers(COOKIE, "whatsdesigns_session=")).is_none());
        assert!(extract_session_token(&headers(AUTHORIZATION, "Bearer   ")).is_none());
        assert!(extract_session_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn cookie_is_secure_only_over_https() {
        let plain = session_cookie(&AuthConfig::new("http://localhost:3000".to_string()), "t");
        let secure = session_cookie(&AuthConfig::new("https://whatsdesigns.com".to_string()), "t");
        let plain = plain.ok().and_then(|v| v.to_str().ok().map(ToString::to_string));
        let secure = secure.ok().and_then(|v| v.to_str().ok().map(ToString::to_string));
        assert!(plain.as_deref().is_some_and(|c| !c.contains("Secure")));
        assert!(secure.as_deref().is_some_and(|c| c.ends_with("; Secure")));
        assert!(plain.as_deref().is_some_and(|c| c.contains("Max-Age=2592000")));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&AuthConfig::new("http://localhost:3000".to_string()));
        let cookie = cookie.ok().and_then(|v| v.to_str().ok().map(ToString::to_string));
        assert!(cookie.as_deref().is_some_and(|c| c.contains("Max-Age=0")));
    }
}

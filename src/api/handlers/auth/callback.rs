//! `sms-magic-link` credential provider callback.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, warn};

use super::{
    session::session_cookie,
    state::AuthState,
    types::{CredentialsRequest, CredentialsResponse, ErrorResponse, Principal},
};
use crate::auth::{
    Verified, VerifyError,
    error::{CREDENTIALS_SIGNIN, INVALID_LINK_MESSAGE},
};

pub const PROVIDER_ID: &str = "sms-magic-link";

#[utoipa::path(
    post,
    path = "/api/auth/callback/sms-magic-link",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Token accepted, session cookie set", body = CredentialsResponse),
        (status = 401, description = "Link invalid, expired or already used", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn credentials_callback(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CredentialsRequest>>,
) -> impl IntoResponse {
    let token = payload.and_then(|Json(request)| request.token);

    match authorize(&auth_state, token.as_deref()).await {
        Some((verified, cookie)) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            let body = CredentialsResponse {
                user: Principal::from(&verified.account),
            };
            (StatusCode::OK, headers, Json(body)).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(CREDENTIALS_SIGNIN).with_message(INVALID_LINK_MESSAGE)),
        )
            .into_response(),
    }
}

/// Run verification and build the session cookie.
///
/// Every failure collapses to `None`; the precise kind only reaches the log.
pub(super) async fn authorize(
    auth_state: &AuthState,
    token: Option<&str>,
) -> Option<(Verified, HeaderValue)> {
    let verified = match auth_state.service().verify(token).await {
        Ok(verified) => verified,
        Err(VerifyError::Internal(err)) => {
            error!(provider = PROVIDER_ID, "verification failed: {err:#}");
            return None;
        }
        Err(err) => {
            warn!(provider = PROVIDER_ID, kind = err.kind(), "rejected login link");
            return None;
        }
    };

    match session_cookie(auth_state.config(), &verified.session.token) {
        Ok(cookie) => Some((verified, cookie)),
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            None
        }
    }
}

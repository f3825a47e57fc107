//! Server-side route guard for protected views.

use axum::{
    extract::{Extension, Request},
    http::{HeaderValue, StatusCode, header::LOCATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::auth::{AuthState, session::authenticate_session};
use crate::auth::{GuardDecision, SessionStatus};

/// Resolve the session and apply the route guard. On `Render` the session
/// claims are attached to the request for the handler.
pub async fn require_session(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = authenticate_session(request.headers(), &auth_state);
    // Server side the session is always resolved, never `Loading`.
    let status = SessionStatus::from(claims.clone());
    let path = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string);

    match auth_state.guard().decide(&status, Some(&path)) {
        GuardDecision::Render => {
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        GuardDecision::Redirect(location) => {
            debug!(path = %path, location = %location, "route guard redirect");
            see_other(&location)
        }
        GuardDecision::Pending => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

fn see_other(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::SEE_OTHER, [(LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

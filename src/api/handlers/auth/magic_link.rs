//! `POST /api/auth/sms-magic-link`: request a login link by SMS.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{error, info};

use super::{
    state::AuthState,
    types::{ErrorResponse, MagicLinkRequest, MagicLinkResponse},
};
use crate::auth::{DeliveryResult, RequestLinkError};

const SENT_MESSAGE: &str = "Magic link sent via SMS";
const ECHOED_MESSAGE: &str = "Magic link generated (development mode)";
const INVALID_PHONE: &str = "Invalid phone number format";
const SEND_FAILED: &str = "Failed to send magic link";

#[utoipa::path(
    post,
    path = "/api/auth/sms-magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Link sent, or echoed in development", body = MagicLinkResponse),
        (status = 400, description = "Invalid phone number", body = ErrorResponse),
        (status = 429, description = "A link was requested too recently", body = ErrorResponse),
        (status = 500, description = "Delivery or storage failure", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn request_magic_link(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MagicLinkRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_PHONE);
    };

    match auth_state.service().request_link(&request.phone).await {
        Ok(requested) => {
            let response = match requested.delivery {
                DeliveryResult::Delivered { .. } => MagicLinkResponse {
                    message: SENT_MESSAGE.to_string(),
                    magic_link: None,
                },
                DeliveryResult::Echoed { link } => MagicLinkResponse {
                    message: ECHOED_MESSAGE.to_string(),
                    magic_link: Some(link),
                },
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(RequestLinkError::Validation) => error_response(StatusCode::BAD_REQUEST, INVALID_PHONE),
        Err(RequestLinkError::RateLimited { minutes }) => {
            info!(minutes, "sms magic link rate limited");
            error_response(
                StatusCode::TOO_MANY_REQUESTS,
                &format!("Please wait {minutes} minutes before requesting another code"),
            )
        }
        Err(err) => {
            error!("SMS magic link error: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, SEND_FAILED)
        }
    }
}

fn error_response(status: StatusCode, error: &str) -> axum::response::Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}

//! Protected dashboard and the unauthorized view.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::auth::types::{ErrorResponse, SessionUser};
use crate::auth::SessionClaims;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DashboardResponse {
    pub user: SessionUser,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Signed-in user", body = DashboardResponse),
        (status = 303, description = "Redirect to sign-in or /unauthorized")
    ),
    tag = "dashboard"
)]
pub async fn dashboard(Extension(claims): Extension<SessionClaims>) -> impl IntoResponse {
    Json(DashboardResponse {
        user: SessionUser::from(&claims),
    })
}

#[utoipa::path(
    get,
    path = "/unauthorized",
    responses(
        (status = 403, description = "Signed in without the required role", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn unauthorized() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(
            ErrorResponse::new("Unauthorized")
                .with_message("You do not have permission to access this page."),
        ),
    )
}

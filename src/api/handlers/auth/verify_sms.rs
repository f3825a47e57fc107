//! `/auth/verify-sms`: the page a magic link opens.
//!
//! `GET` only renders a self-submitting form; the token is consumed by the
//! `POST` it sends. Link previewers and other fetchers that do not submit
//! forms therefore never spend the single-use token.

use axum::{
    Form,
    extract::{Extension, Query},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, LOCATION, REFERRER_POLICY, SET_COOKIE},
    },
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::{callback::authorize, state::AuthState};
use crate::auth::error::CREDENTIALS_SIGNIN;

pub const SUCCESS_REDIRECT: &str = "/dashboard";

#[derive(Deserialize, IntoParams, ToSchema, Debug)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/verify-sms",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Page that posts the token back to this path", body = String, content_type = "text/html"),
        (status = 303, description = "No token, redirect to /auth/error")
    ),
    tag = "auth"
)]
pub async fn verify_sms_page(Query(query): Query<VerifyQuery>) -> Response {
    let Some(token) = query.token.filter(|token| !token.trim().is_empty()) else {
        return see_other(&error_location(), HeaderMap::new());
    };

    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    (StatusCode::OK, headers, Html(submit_page(&token))).into_response()
}

#[utoipa::path(
    post,
    path = "/auth/verify-sms",
    request_body(content = VerifyQuery, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /dashboard with a session cookie, or to /auth/error")
    ),
    tag = "auth"
)]
pub async fn verify_sms(
    auth_state: Extension<Arc<AuthState>>,
    form: Option<Form<VerifyQuery>>,
) -> Response {
    let token = form.and_then(|Form(form)| form.token);

    let mut headers = HeaderMap::new();
    let location = match authorize(&auth_state, token.as_deref()).await {
        Some((_, cookie)) => {
            headers.insert(SET_COOKIE, cookie);
            SUCCESS_REDIRECT.to_string()
        }
        None => error_location(),
    };

    see_other(&location, headers)
}

fn see_other(location: &str, mut headers: HeaderMap) -> Response {
    if let Ok(location) = HeaderValue::from_str(location) {
        headers.insert(LOCATION, location);
    }
    (StatusCode::SEE_OTHER, headers).into_response()
}

fn error_location() -> String {
    format!("/auth/error?error={CREDENTIALS_SIGNIN}")
}

// Relative action keeps any path prefix the app is served under.
fn submit_page(token: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="robots" content="noindex">
<title>Signing in</title>
</head>
<body onload="document.forms[0].submit()">
<form method="post" action="verify-sms">
<input type="hidden" name="token" value="{}">
<noscript><button type="submit">Sign in</button></noscript>
</form>
</body>
</html>
"#,
        escape_attribute(token)
    )
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

//! Access decisions for protected views.
//!
//! `decide` is pure so it can back both the HTTP middleware and any client
//! that resolves the session asynchronously (hence `Loading`).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::session::SessionClaims;

pub const SIGNIN_PATH: &str = "/auth/signin";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

// Characters a URI component keeps as-is, like `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Unauthenticated,
    Authenticated(SessionClaims),
}

impl From<Option<SessionClaims>> for SessionStatus {
    fn from(claims: Option<SessionClaims>) -> Self {
        claims.map_or(Self::Unauthenticated, Self::Authenticated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show nothing protected.
    Pending,
    Redirect(String),
    Render,
}

#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    required_role: Option<String>,
}

impl RouteGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }

    #[must_use]
    pub fn required_role(&self) -> Option<&str> {
        self.required_role.as_deref()
    }

    #[must_use]
    pub fn decide(&self, status: &SessionStatus, requested_path: Option<&str>) -> GuardDecision {
        match status {
            SessionStatus::Loading => GuardDecision::Pending,
            SessionStatus::Unauthenticated => {
                GuardDecision::Redirect(signin_redirect(requested_path))
            }
            SessionStatus::Authenticated(claims) => match self.required_role.as_deref() {
                Some(required) if claims.role.as_deref() != Some(required) => {
                    GuardDecision::Redirect(UNAUTHORIZED_PATH.to_string())
                }
                _ => GuardDecision::Render,
            },
        }
    }
}

/// `/auth/signin?callbackUrl=<encoded path and query>`; the value is empty
/// without a path.
#[must_use]
pub fn signin_redirect(requested_path: Option<&str>) -> String {
    let callback = requested_path
        .map(|path| utf8_percent_encode(path, COMPONENT).to_string())
        .unwrap_or_default();
    format!("{SIGNIN_PATH}?callbackUrl={callback}")
}

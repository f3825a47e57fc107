//! Auth configuration and the shared state injected into handlers.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use url::Url;

use crate::auth::{
    AccountStore, AttemptStore, Delivery, MagicLinkService, RouteGuard, SessionIssuer,
    TokenCodec, attempts::DEFAULT_RATE_LIMIT_WINDOW_SECONDS, session::DEFAULT_SESSION_TTL_SECONDS,
    token::DEFAULT_LINK_TTL_SECONDS,
};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    link_ttl_seconds: i64,
    rate_limit_window_seconds: i64,
    session_ttl_seconds: i64,
    required_role: Option<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            link_ttl_seconds: DEFAULT_LINK_TTL_SECONDS,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            required_role: None,
        }
    }

    #[must_use]
    pub fn with_link_ttl_seconds(mut self, seconds: i64) -> Self {
        self.link_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: i64) -> Self {
        self.rate_limit_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Role a session must carry to reach `/dashboard`.
    #[must_use]
    pub fn with_required_role(mut self, role: Option<String>) -> Self {
        self.required_role = role.filter(|role| !role.trim().is_empty());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn link_ttl_seconds(&self) -> i64 {
        self.link_ttl_seconds
    }

    #[must_use]
    pub fn rate_limit_window_seconds(&self) -> i64 {
        self.rate_limit_window_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn required_role(&self) -> Option<&str> {
        self.required_role.as_deref()
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    service: MagicLinkService,
    guard: RouteGuard,
}

impl AuthState {
    /// Wire codec, session issuer, stores and delivery into one service.
    ///
    /// # Errors
    /// Returns an error for an empty secret or an unparsable base URL.
    pub fn new(
        config: AuthConfig,
        secret: &SecretString,
        attempts: Arc<dyn AttemptStore>,
        accounts: Arc<dyn AccountStore>,
        delivery: Delivery,
    ) -> Result<Self> {
        let base_url = Url::parse(config.base_url())
            .with_context(|| format!("Invalid base URL: {}", config.base_url()))?;
        let codec = TokenCodec::new(secret)?.with_ttl_seconds(config.link_ttl_seconds());
        let sessions = SessionIssuer::new(secret)?.with_ttl_seconds(config.session_ttl_seconds());
        let service = MagicLinkService::new(codec, sessions, attempts, accounts, delivery, base_url)
            .with_rate_limit_window_seconds(config.rate_limit_window_seconds());

        let guard = match config.required_role() {
            Some(role) => RouteGuard::new().with_required_role(role),
            None => RouteGuard::new(),
        };

        Ok(Self {
            config,
            service,
            guard,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn service(&self) -> &MagicLinkService {
        &self.service
    }

    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }
}

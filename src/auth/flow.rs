//! Request and verification flows.
//!
//! Requesting a link: validate phone, reject if a link went out inside the
//! rate-limit window, issue a token, deliver it, then record the attempt.
//! The attempt is written only after delivery succeeded so a provider outage
//! does not lock the caller out for the whole window.
//!
//! Verifying a link walks `Received -> TokenChecked -> AttemptChecked ->
//! AccountResolved -> SessionEstablished`; any step may stop with a
//! [`VerifyError`].

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{
    accounts::{Account, AccountStore},
    attempts::{AttemptStore, DEFAULT_RATE_LIMIT_WINDOW_SECONDS, LoginAttempt, wait_minutes},
    delivery::{Delivery, DeliveryResult},
    error::{RequestLinkError, VerifyError},
    session::{Session, SessionIssuer},
    token::TokenCodec,
};

pub const VERIFY_PATH: &str = "/auth/verify-sms";
const PHONE_MIN_LEN: usize = 10;
const PHONE_MAX_LEN: usize = 15;

/// Accepts 10 to 15 characters; the provider performs the real E.164 check.
#[must_use]
pub fn valid_phone(phone: &str) -> bool {
    (PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&phone.chars().count())
}

/// Build `{base_url}/auth/verify-sms?token={token}`, keeping any path prefix
/// of the base URL.
///
/// # Errors
/// Returns an error if the base URL cannot carry a path.
pub fn magic_link(base_url: &Url, token: &str) -> Result<String> {
    let mut link = base_url.clone();
    link.path_segments_mut()
        .map_err(|()| anyhow!("base URL cannot carry a path: {base_url}"))?
        .pop_if_empty()
        .extend(VERIFY_PATH.split('/').filter(|segment| !segment.is_empty()));
    link.set_fragment(None);
    link.query_pairs_mut().clear().append_pair("token", token);
    Ok(link.to_string())
}

#[derive(Debug)]
pub struct LinkRequested {
    pub attempt: LoginAttempt,
    pub delivery: DeliveryResult,
}

#[derive(Debug)]
pub struct Verified {
    pub account: Account,
    pub session: Session,
}

pub struct MagicLinkService {
    codec: TokenCodec,
    sessions: SessionIssuer,
    attempts: Arc<dyn AttemptStore>,
    accounts: Arc<dyn AccountStore>,
    delivery: Delivery,
    base_url: Url,
    rate_limit_window: Duration,
}

impl MagicLinkService {
    #[must_use]
    pub fn new(
        codec: TokenCodec,
        sessions: SessionIssuer,
        attempts: Arc<dyn AttemptStore>,
        accounts: Arc<dyn AccountStore>,
        delivery: Delivery,
        base_url: Url,
    ) -> Self {
        Self {
            codec,
            sessions,
            attempts,
            accounts,
            delivery,
            base_url,
            rate_limit_window: Duration::seconds(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
        }
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: i64) -> Self {
        self.rate_limit_window = Duration::seconds(seconds);
        self
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    #[must_use]
    pub fn attempts(&self) -> &Arc<dyn AttemptStore> {
        &self.attempts
    }

    #[must_use]
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Issue and deliver a magic link for `phone`.
    ///
    /// # Errors
    /// See [`RequestLinkError`].
    #[instrument(skip(self))]
    pub async fn request_link(&self, phone: &str) -> Result<LinkRequested, RequestLinkError> {
        if !valid_phone(phone) {
            return Err(RequestLinkError::Validation);
        }

        let now = Utc::now();
        if let Some(recent) = self
            .attempts
            .recent_attempt(phone, now - self.rate_limit_window)
            .await?
        {
            let minutes = wait_minutes(recent.created_at, self.rate_limit_window, now);
            debug!(minutes, "recent attempt inside rate-limit window");
            return Err(RequestLinkError::RateLimited { minutes });
        }

        let token = self.codec.issue(phone)?;
        let link = magic_link(&self.base_url, &token)?;
        let delivery = self.delivery.deliver(phone, &link).await?;
        let attempt = self
            .attempts
            .record_attempt(phone, &token, delivery.reference())
            .await?;

        info!(attempt_id = %attempt.id, "magic link issued");
        Ok(LinkRequested { attempt, delivery })
    }

    /// Verify a magic link token and establish a session.
    ///
    /// # Errors
    /// See [`VerifyError`]; callers should only ever show the generic message.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: Option<&str>) -> Result<Verified, VerifyError> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(VerifyError::NoToken),
        };

        let claims = self.codec.verify(token)?;

        let attempt = self
            .attempts
            .find_attempt(token)
            .await?
            .ok_or(VerifyError::NotFound)?;
        if attempt.used {
            return Err(VerifyError::Used);
        }
        if attempt.phone != claims.phone {
            warn!(attempt_id = %attempt.id, "token phone does not match stored attempt");
            return Err(VerifyError::NotFound);
        }

        if !self.attempts.mark_used(token).await? {
            debug!(attempt_id = %attempt.id, "lost race consuming token");
            return Err(VerifyError::Used);
        }

        let account = self.accounts.find_or_create(&claims.phone).await?;
        let session = self
            .sessions
            .issue(&account)
            .context("failed to issue session")?;

        info!(user_id = %account.id, "sms magic link verified");
        Ok(Verified { account, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        error::TokenError,
        memory::{MemoryAccountStore, MemoryAttemptStore},
    };
    use secrecy::SecretString;

    struct Harness {
        service: MagicLinkService,
        attempts: Arc<MemoryAttemptStore>,
        accounts: Arc<MemoryAccountStore>,
        codec: TokenCodec,
    }

    fn harness() -> Result<Harness> {
        let secret = SecretString::from("flow-secret".to_string());
        let codec = TokenCodec::new(&secret)?;
        let attempts = Arc::new(MemoryAttemptStore::new());
        let accounts = Arc::new(MemoryAccountStore::new());
        let service = MagicLinkService::new(
            codec.clone(),
            SessionIssuer::new(&secret)?,
            attempts.clone(),
            accounts.clone(),
            Delivery::LocalEcho,
            Url::parse("http://localhost:3000")?,
        );
        Ok(Harness {
            service,
            attempts,
            accounts,
            codec,
        })
    }

    fn token_from(link: &str) -> Option<String> {
        Url::parse(link).ok().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
    }

    #[test]
    fn phone_length_bounds() {
        assert!(!valid_phone("123456789"));
        assert!(valid_phone("1234567890"));
        assert!(valid_phone("+15551234567"));
        assert!(valid_phone("123456789012345"));
        assert!(!valid_phone("1234567890123456"));
        assert!(!valid_phone(""));
    }

    #[test]
    fn magic_link_points_at_verify_page() -> Result<()> {
        let base = Url::parse("https://whatsdesigns.com")?;
        let link = magic_link(&base, "a.b.c")?;
        assert_eq!(link, "https://whatsdesigns.com/auth/verify-sms?token=a.b.c");
        Ok(())
    }

    #[test]
    fn magic_link_keeps_base_path() -> Result<()> {
        for base in ["https://whatsdesigns.com/app", "https://whatsdesigns.com/app/"] {
            let link = magic_link(&Url::parse(base)?, "t")?;
            assert_eq!(link, "https://whatsdesigns.com/app/auth/verify-sms?token=t");
        }
        let link = magic_link(&Url::parse("http://localhost:3000/?ref=sms#top")?, "t")?;
        assert_eq!(link, "http://localhost:3000/auth/verify-sms?token=t");
        Ok(())
    }

    #[tokio::test]
    async fn request_then_verify_once() -> Result<()> {
        let h = harness()?;
        let requested = h.service.request_link("+15551234567").await?;
        let link = requested
            .delivery
            .echoed_link()
            .map(ToString::to_string)
            .unwrap_or_default();
        let token = token_from(&link).unwrap_or_default();
        assert_eq!(token, requested.attempt.token);

        let verified = h.service.verify(Some(&token)).await?;
        assert_eq!(verified.account.phone, "+15551234567");
        assert_eq!(verified.session.claims.user_id, verified.account.id);
        assert_eq!(h.accounts.len().await, 1);

        let replay = h.service.verify(Some(&token)).await;
        assert!(matches!(replay, Err(VerifyError::Used)));
        assert_eq!(h.accounts.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn second_request_is_rate_limited() -> Result<()> {
        let h = harness()?;
        h.service.request_link("+15551234567").await?;
        match h.service.request_link("+15551234567").await {
            Err(RequestLinkError::RateLimited { minutes }) => {
                assert!((1..=5).contains(&minutes));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
        // Other numbers are unaffected.
        h.service.request_link("+15550000000").await?;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_phone_is_rejected_without_recording() -> Result<()> {
        let h = harness()?;
        let result = h.service.request_link("123").await;
        assert!(matches!(result, Err(RequestLinkError::Validation)));
        assert!(h.attempts.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_token_is_no_token() -> Result<()> {
        let h = harness()?;
        assert!(matches!(h.service.verify(None).await, Err(VerifyError::NoToken)));
        assert!(matches!(
            h.service.verify(Some("  ")).await,
            Err(VerifyError::NoToken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn valid_token_without_attempt_is_not_found() -> Result<()> {
        let h = harness()?;
        let token = h.codec.issue("+15551234567")?;
        assert!(matches!(
            h.service.verify(Some(&token)).await,
            Err(VerifyError::NotFound)
        ));
        assert!(h.accounts.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_fails_even_when_attempt_is_unused() -> Result<()> {
        let h = harness()?;
        let token = h
            .codec
            .issue_at("+15551234567", Utc::now() - Duration::minutes(16))?;
        h.attempts
            .record_attempt("+15551234567", &token, None)
            .await?;
        let result = h.service.verify(Some(&token)).await;
        assert!(matches!(
            result,
            Err(VerifyError::Invalid(TokenError::Expired))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_verification_has_single_winner() -> Result<()> {
        let h = harness()?;
        let requested = h.service.request_link("+15551234567").await?;
        let token = requested.attempt.token;
        let service = Arc::new(h.service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                service.verify(Some(&token)).await.is_ok()
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await? {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(h.accounts.len().await, 1);
        Ok(())
    }
}

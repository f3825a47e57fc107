//! Signed, time-limited magic link tokens.
//!
//! A token is an HS256 JWT binding a phone number to its issuance time. The
//! expiry is enforced here with zero leeway, independently of whatever the
//! attempt store says about the token.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::error::TokenError;

pub const DEFAULT_LINK_TTL_SECONDS: i64 = 15 * 60;
const MAGIC_LINK_AUDIENCE: &str = "sms-magic-link";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MagicLinkClaims {
    pub phone: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    pub jti: String,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    /// Build a codec from the process signing secret.
    ///
    /// # Errors
    /// Returns an error if the secret is empty.
    pub fn new(secret: &SecretString) -> Result<Self> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(anyhow!("signing secret must not be empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(DEFAULT_LINK_TTL_SECONDS),
        })
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl = Duration::seconds(seconds);
        self
    }

    /// Issue a token for `phone` expiring one TTL from now.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, phone: &str) -> Result<String> {
        self.issue_at(phone, Utc::now())
    }

    /// Issue a token as if it had been created at `issued_at`.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue_at(&self, phone: &str, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = MagicLinkClaims {
            phone: phone.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
            aud: MAGIC_LINK_AUDIENCE.to_string(),
            jti: Ulid::new().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| anyhow!("failed to sign magic link token: {err}"))
    }

    /// Check signature, audience and expiry.
    ///
    /// # Errors
    /// Returns the [`TokenError`] kind describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<MagicLinkClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[MAGIC_LINK_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        let data = decode::<MagicLinkClaims>(token, &self.decoding_key, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            },
        )?;

        if data.claims.phone.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(data.claims)
    }
}

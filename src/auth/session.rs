//! Session tokens issued after a successful verification.
//!
//! Sessions are stateless HS256 JWTs under the `session` audience, so a
//! magic link token can never be replayed as a session and vice versa.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accounts::Account;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const SESSION_AUDIENCE: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl SessionClaims {
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly minted session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
}

#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
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
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
        })
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl = Duration::seconds(seconds);
        self
    }

    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, account: &Account) -> Result<Session> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: account.id.to_string(),
            user_id: account.id,
            phone: account.phone.clone(),
            role: account.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            aud: SESSION_AUDIENCE.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| anyhow!("failed to sign session token: {err}"))?;
        Ok(Session { token, claims })
    }

    /// Decode a session token; `None` for anything that is not a live session.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[SESSION_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "aud", "sub"]);
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .ok()
            .map(|data| data.claims)
    }
}

//! Error kinds for link issuance and verification.
//!
//! Verification keeps a precise kind for logs while the HTTP layer collapses
//! every kind into [`INVALID_LINK_MESSAGE`].

use thiserror::Error;

/// Public message for any rejected login link.
pub const INVALID_LINK_MESSAGE: &str = "This login link is invalid or has expired.";

/// Error code reported by the `sms-magic-link` credential provider.
pub const CREDENTIALS_SIGNIN: &str = "CredentialsSignin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    SignatureInvalid,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sms provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sms provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Failures while requesting a new login link.
#[derive(Debug, Error)]
pub enum RequestLinkError {
    #[error("invalid phone number format")]
    Validation,
    #[error("login link requested too recently, retry in {minutes} minutes")]
    RateLimited { minutes: i64 },
    #[error("delivery failed: {0}")]
    DeliveryFailed(#[from] DeliveryError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Terminal failures of the verification state machine.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no token provided")]
    NoToken,
    #[error("token rejected: {0}")]
    Invalid(TokenError),
    #[error("token not found")]
    NotFound,
    #[error("token already used")]
    Used,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl VerifyError {
    /// Stable label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoToken => "no_token",
            Self::Invalid(TokenError::Expired) => "expired",
            Self::Invalid(TokenError::Malformed) => "malformed",
            Self::Invalid(TokenError::SignatureInvalid) => "signature_invalid",
            Self::NotFound => "not_found",
            Self::Used => "used",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<TokenError> for VerifyError {
    fn from(err: TokenError) -> Self {
        Self::Invalid(err)
    }
}

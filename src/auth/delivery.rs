//! Magic link delivery.
//!
//! The gateway is picked once at startup: a live Twilio sender, or a local
//! echo that hands the link back to the caller. Local echo only exists in
//! development; production without provider credentials refuses to start.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{fmt, str::FromStr, time::Duration};
use tracing::{info, instrument, warn};

use super::error::DeliveryError;
use crate::APP_USER_AGENT;

pub const DEFAULT_TWILIO_API_URL: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS body sent with every live link.
#[must_use]
pub fn sms_body(link: &str) -> String {
    format!("Your WhatsDesigns login link (valid for 15 min): {link}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow!(
                "unknown environment '{other}', expected 'development' or 'production'"
            )),
        }
    }
}

#[derive(Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from: String,
    pub api_url: String,
}

impl fmt::Debug for TwilioOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioOptions")
            .field("account_sid", &self.account_sid)
            .field("from", &self.from)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TwilioOptions {
    /// Assemble options from the three optional credentials. All or none must
    /// be present.
    ///
    /// # Errors
    /// Returns an error when only some of the credentials are set.
    pub fn from_parts(
        account_sid: Option<String>,
        auth_token: Option<SecretString>,
        from: Option<String>,
        api_url: Option<String>,
    ) -> Result<Option<Self>> {
        let account_sid = account_sid.filter(|value| !value.trim().is_empty());
        let auth_token = auth_token.filter(|value| !value.expose_secret().trim().is_empty());
        let from = from.filter(|value| !value.trim().is_empty());

        match (account_sid, auth_token, from) {
            (None, None, None) => Ok(None),
            (Some(account_sid), Some(auth_token), Some(from)) => Ok(Some(Self {
                account_sid,
                auth_token,
                from,
                api_url: api_url.unwrap_or_else(|| DEFAULT_TWILIO_API_URL.to_string()),
            })),
            (account_sid, auth_token, from) => {
                let missing: Vec<&str> = [
                    ("TWILIO_ACCOUNT_SID", account_sid.is_none()),
                    ("TWILIO_AUTH_TOKEN", auth_token.is_none()),
                    ("TWILIO_PHONE_NUMBER", from.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(anyhow!(
                    "incomplete Twilio credentials, missing: {}",
                    missing.join(", ")
                ))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered { reference: String },
    Echoed { link: String },
}

impl DeliveryResult {
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Delivered { reference } => Some(reference),
            Self::Echoed { .. } => None,
        }
    }

    #[must_use]
    pub fn echoed_link(&self) -> Option<&str> {
        match self {
            Self::Delivered { .. } => None,
            Self::Echoed { link } => Some(link),
        }
    }
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
}

/// Twilio Messages API client.
#[derive(Clone)]
pub struct TwilioSms {
    client: Client,
    options: TwilioOptions,
}

impl TwilioSms {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: TwilioOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build Twilio HTTP client")?;
        Ok(Self { client, options })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.options.api_url.trim_end_matches('/'),
            self.options.account_sid
        )
    }

    /// Send one SMS. No retries.
    ///
    /// # Errors
    /// Returns [`DeliveryError`] on transport failure, a non-2xx status, or an
    /// unparsable response body.
    #[instrument(skip(self, body), fields(provider = "twilio"))]
    pub async fn send(&self, to: &str, body: &str) -> Result<String, DeliveryError> {
        let form = [("To", to), ("From", self.options.from.as_str()), ("Body", body)];
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.options.account_sid,
                Some(self.options.auth_token.expose_secret()),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Twilio rejected message");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message: MessageResource = response.json().await?;
        Ok(message.sid)
    }
}

pub enum Delivery {
    Live(TwilioSms),
    LocalEcho,
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(sms) => f.debug_tuple("Live").field(&sms.options).finish(),
            Self::LocalEcho => f.write_str("LocalEcho"),
        }
    }
}

impl Delivery {
    /// Choose the gateway for this process.
    ///
    /// # Errors
    /// Production without Twilio credentials is a configuration error.
    pub fn select(environment: Environment, twilio: Option<TwilioOptions>) -> Result<Self> {
        match (environment, twilio) {
            (_, Some(options)) => Ok(Self::Live(TwilioSms::new(options)?)),
            (Environment::Development, None) => Ok(Self::LocalEcho),
            (Environment::Production, None) => Err(anyhow!(
                "Twilio credentials are required in production (TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_PHONE_NUMBER)"
            )),
        }
    }

    #[must_use]
    pub fn is_local_echo(&self) -> bool {
        matches!(self, Self::LocalEcho)
    }

    /// Deliver `link` to `phone`.
    ///
    /// # Errors
    /// Returns [`DeliveryError`] when the live provider fails.
    pub async fn deliver(&self, phone: &str, link: &str) -> Result<DeliveryResult, DeliveryError> {
        match self {
            Self::Live(sms) => {
                let reference = sms.send(phone, &sms_body(link)).await?;
                info!(delivery_ref = %reference, "magic link sent");
                Ok(DeliveryResult::Delivered { reference })
            }
            Self::LocalEcho => {
                info!(magic_link = %link, "local mode, magic link not sent");
                Ok(DeliveryResult::Echoed {
                    link: link.to_string(),
                })
            }
        }
    }
}

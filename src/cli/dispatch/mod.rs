//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action. Configuration problems that clap
//! cannot express (blank secret, partial Twilio credentials, production
//! without an SMS provider, bad base URL) are rejected here so the process
//! never starts half-configured.

use crate::auth::{Delivery, Environment};
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, auth, sms};
use anyhow::{Context, Result, anyhow};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let base_url = Url::parse(&auth_opts.base_url)
        .with_context(|| format!("invalid WHATSDESIGNS_BASE_URL: {}", auth_opts.base_url))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "WHATSDESIGNS_BASE_URL must use http or https, got '{}'",
            base_url.scheme()
        ));
    }

    let twilio = sms::parse(matches)?;
    if auth_opts.environment == Environment::Production && twilio.is_none() {
        return Err(anyhow!(
            "SMS delivery is required in production: set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_PHONE_NUMBER, or run with WHATSDESIGNS_ENV=development"
        ));
    }

    Ok(Action::Server(Args {
        port,
        dsn,
        secret: auth_opts.secret,
        base_url: auth_opts.base_url,
        environment: auth_opts.environment,
        link_ttl_seconds: auth_opts.link_ttl_seconds,
        rate_limit_window_seconds: auth_opts.rate_limit_window_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        dashboard_role: auth_opts.dashboard_role,
        twilio,
    }))
}

/// Pick the delivery gateway for parsed server arguments.
///
/// # Errors
/// See [`Delivery::select`].
pub fn delivery(args: &Args) -> Result<Delivery> {
    Delivery::select(args.environment, args.twilio.clone())
}

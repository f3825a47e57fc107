use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};

use crate::auth::Environment;

pub const ARG_SECRET: &str = "secret";
pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_LINK_TTL_SECONDS: &str = "link-ttl-seconds";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "rate-limit-window-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_DASHBOARD_ROLE: &str = "dashboard-role";

#[derive(Debug)]
pub struct Options {
    pub secret: SecretString,
    pub base_url: String,
    pub environment: Environment,
    pub link_ttl_seconds: i64,
    pub rate_limit_window_seconds: i64,
    pub session_ttl_seconds: i64,
    pub dashboard_role: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if the signing secret is missing or blank, or the
    /// environment is unknown.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = matches
            .get_one::<String>(ARG_SECRET)
            .cloned()
            .context("missing required argument: --secret")?;
        let secret = SecretString::from(secret);
        if secret.expose_secret().trim().is_empty() {
            return Err(anyhow!("--secret (WHATSDESIGNS_SECRET) must not be empty"));
        }

        let environment = matches
            .get_one::<String>(ARG_ENVIRONMENT)
            .map_or(Ok(Environment::default()), |value| value.parse())?;

        Ok(Self {
            secret,
            base_url: matches
                .get_one::<String>(ARG_BASE_URL)
                .cloned()
                .context("missing required argument: --base-url")?,
            environment,
            link_ttl_seconds: seconds(matches, ARG_LINK_TTL_SECONDS)?,
            rate_limit_window_seconds: seconds(matches, ARG_RATE_LIMIT_WINDOW_SECONDS)?,
            session_ttl_seconds: seconds(matches, ARG_SESSION_TTL_SECONDS)?,
            dashboard_role: matches.get_one::<String>(ARG_DASHBOARD_ROLE).cloned(),
        })
    }
}

fn seconds(matches: &ArgMatches, id: &str) -> Result<i64> {
    matches
        .get_one::<i64>(id)
        .copied()
        .with_context(|| format!("missing required argument: --{id}"))
}

// The throttle message reports whole minutes, so the window must be one.
fn whole_minutes(value: &str) -> Result<i64, String> {
    let seconds: i64 = value
        .parse()
        .map_err(|e| format!("invalid number of seconds: {e}"))?;
    if seconds < 60 || seconds % 60 != 0 {
        return Err(format!("{seconds} is not a positive multiple of 60"));
    }
    Ok(seconds)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET)
                .long(ARG_SECRET)
                .help("Secret used to sign magic link and session tokens")
                .env("WHATSDESIGNS_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL used to build magic links")
                .env("WHATSDESIGNS_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; development allows echoing links without SMS")
                .env("WHATSDESIGNS_ENV")
                .default_value("production")
                .value_parser(["production", "development"]),
        )
        .arg(
            Arg::new(ARG_LINK_TTL_SECONDS)
                .long(ARG_LINK_TTL_SECONDS)
                .help("Magic link lifetime in seconds")
                .env("WHATSDESIGNS_LINK_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Minimum seconds between link requests for one phone number (whole minutes)")
                .env("WHATSDESIGNS_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("300")
                .value_parser(whole_minutes),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("WHATSDESIGNS_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_DASHBOARD_ROLE)
                .long(ARG_DASHBOARD_ROLE)
                .help("Role required to open /dashboard (any signed-in user when unset)")
                .env("WHATSDESIGNS_DASHBOARD_ROLE"),
        )
}

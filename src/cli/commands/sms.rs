use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use regex::Regex;
use secrecy::SecretString;

use crate::auth::{TwilioOptions, delivery::DEFAULT_TWILIO_API_URL};

pub const ARG_TWILIO_ACCOUNT_SID: &str = "twilio-account-sid";
pub const ARG_TWILIO_AUTH_TOKEN: &str = "twilio-auth-token";
pub const ARG_TWILIO_PHONE_NUMBER: &str = "twilio-phone-number";
pub const ARG_TWILIO_API_URL: &str = "twilio-api-url";

/// Sender numbers must be E.164.
#[must_use]
pub fn valid_sender(number: &str) -> bool {
    Regex::new(r"^\+[1-9][0-9]{6,14}$").is_ok_and(|re| re.is_match(number))
}

/// Parse the Twilio credentials. `None` when none of them is set.
///
/// # Errors
/// Returns an error for partial credentials or a malformed sender number.
pub fn parse(matches: &ArgMatches) -> Result<Option<TwilioOptions>> {
    let options = TwilioOptions::from_parts(
        matches.get_one::<String>(ARG_TWILIO_ACCOUNT_SID).cloned(),
        matches
            .get_one::<String>(ARG_TWILIO_AUTH_TOKEN)
            .cloned()
            .map(SecretString::from),
        matches.get_one::<String>(ARG_TWILIO_PHONE_NUMBER).cloned(),
        matches.get_one::<String>(ARG_TWILIO_API_URL).cloned(),
    )?;

    if let Some(options) = &options {
        if !valid_sender(&options.from) {
            return Err(anyhow!(
                "TWILIO_PHONE_NUMBER must be an E.164 number like +15550001111, got '{}'",
                options.from
            ));
        }
    }

    Ok(options)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TWILIO_ACCOUNT_SID)
                .long(ARG_TWILIO_ACCOUNT_SID)
                .help("Twilio account SID")
                .env("TWILIO_ACCOUNT_SID"),
        )
        .arg(
            Arg::new(ARG_TWILIO_AUTH_TOKEN)
                .long(ARG_TWILIO_AUTH_TOKEN)
                .help("Twilio auth token")
                .env("TWILIO_AUTH_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TWILIO_PHONE_NUMBER)
                .long(ARG_TWILIO_PHONE_NUMBER)
                .help("Sender phone number for magic link SMS")
                .env("TWILIO_PHONE_NUMBER"),
        )
        .arg(
            Arg::new(ARG_TWILIO_API_URL)
                .long(ARG_TWILIO_API_URL)
                .help("Twilio API base URL")
                .env("TWILIO_API_URL")
                .default_value(DEFAULT_TWILIO_API_URL),
        )
}

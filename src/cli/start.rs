use crate::cli::{
    actions::Action,
    commands::{self, logging::ARG_VERBOSITY},
    dispatch::handler,
    telemetry::{self, Telemetry},
};
use anyhow::Result;
use tracing::Level;

const fn get_verbosity_level(count: u8) -> Level {
    match count {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Start the CLI
///
/// # Errors
/// Returns an error if telemetry cannot be installed or the arguments are inconsistent.
pub fn start() -> Result<(Action, Telemetry)> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0);
    let telemetry = telemetry::init(Some(get_verbosity_level(verbosity)))?;

    let action = handler(&matches)?;

    Ok((action, telemetry))
}

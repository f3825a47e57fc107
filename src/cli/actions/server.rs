use crate::{
    api::{self, handlers::auth::AuthConfig},
    auth::{Environment, TwilioOptions},
    cli::dispatch,
};
use anyhow::Result;
use secrecy::SecretString;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub secret: SecretString,
    pub base_url: String,
    pub environment: Environment,
    pub link_ttl_seconds: i64,
    pub rate_limit_window_seconds: i64,
    pub session_ttl_seconds: i64,
    pub dashboard_role: Option<String>,
    pub twilio: Option<TwilioOptions>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is inconsistent or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let delivery = dispatch::delivery(&args)?;
    if delivery.is_local_echo() {
        warn!("No SMS provider configured: magic links are returned to the caller");
    }

    let auth_config = AuthConfig::new(args.base_url)
        .with_link_ttl_seconds(args.link_ttl_seconds)
        .with_rate_limit_window_seconds(args.rate_limit_window_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_required_role(args.dashboard_role);

    info!(
        environment = %args.environment,
        base_url = auth_config.base_url(),
        "starting whatsdesigns"
    );

    api::new(
        args.port,
        &args.dsn,
        &args.secret,
        auth_config,
        delivery,
        shutdown_signal(),
    )
    .await
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

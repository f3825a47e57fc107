use anyhow::Result;
use whatsdesigns::cli::start;

#[tokio::main]
async fn main() -> Result<()> {
    let (action, telemetry) = start()?;

    let result = action.execute().await;

    // flush spans even when the server failed
    telemetry.shutdown();

    result
}

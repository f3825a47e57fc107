//! Print the OpenAPI document, e.g. `cargo run --bin openapi > openapi.json`.

use anyhow::Result;

fn main() -> Result<()> {
    let spec = whatsdesigns::api::openapi();
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

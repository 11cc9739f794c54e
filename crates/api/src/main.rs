//! AI Gateway - Main Entry Point

use api::{init_logging, run_server, GatewayConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== AI Gateway v{} ===", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::from_env()?;
    run_server(config).await?;

    Ok(())
}

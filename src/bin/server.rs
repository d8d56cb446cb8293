//! HTTP server for natural-language warehouse queries

use anyhow::Context;
use querybridge::api::{start_server, ApiState};
use querybridge::observability::init_tracing;
use querybridge::{Config, QueryService};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    let dotenv_loaded = dotenv::dotenv().is_ok();
    init_tracing();
    if !dotenv_loaded {
        warn!("No .env file found, using process environment");
    }

    let config = Config::from_env().context("failed to load configuration")?;
    info!("Starting query server on {}", config.bind_addr);

    let service = QueryService::from_config(&config).context("failed to initialise query service")?;
    start_server(config.bind_addr, ApiState::new(service)).await?;

    Ok(())
}

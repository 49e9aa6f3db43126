//! Vehicle advisor - EV range and predictive maintenance API
//!
//! Resolves both models at startup (loading persisted artifacts or training
//! synthetic fallbacks) and serves predictions until interrupted.

use advisor_lib::{HealthRegistry, StructuredLogger};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vehicle_advisor::{api, config::AdvisorConfig, initialize_service};

const ADVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting vehicle-advisor");

    let config = AdvisorConfig::load()?;
    let bind = config.bind_addr();
    info!(instance = %config.instance_name, bind = %bind, "Advisor configured");

    let logger = StructuredLogger::new(&config.instance_name);
    let health_registry = HealthRegistry::new();

    let service = initialize_service(&config, logger.clone(), &health_registry).await?;

    let app_state = Arc::new(api::AppState::new(service, health_registry));
    let router = api::create_router(app_state, &config.cors_origins);

    logger.log_startup(ADVISOR_VERSION, &bind);

    let shutdown_logger = logger.clone();
    api::serve(&bind, router, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shut down");
    Ok(())
}

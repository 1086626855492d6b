use anyhow::{Context, Result};
use relay_core::init_tracing;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::components::build_relay_components;
use crate::config::RelayConfig;
use crate::server::{build_router, serve, shutdown_signal};

/// Main entry: validate config, init logging, open the store, build the pipeline, then serve
/// until Ctrl-C / SIGTERM and close the store.
#[instrument(skip(config))]
pub async fn run_relay(config: RelayConfig) -> Result<()> {
    config.validate()?;
    init_tracing(config.base().log_file.as_str())?;

    if config.base().skip_signature_validation {
        warn!("SKIP_SIGNATURE_VALIDATION=true: webhook signatures will not be checked");
    }
    info!(
        store_type = %config.base().store_type,
        database_url = %config.base().database_url,
        history_limit = config.pipeline().history_limit,
        rate_limit_ceiling = config.pipeline().rate_limit_ceiling,
        "Initializing relay"
    );

    let components = build_relay_components(&config).await?;
    let listener = TcpListener::bind(&config.base().bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.base().bind_addr))?;

    info!("Relay started successfully");
    let served = serve(listener, build_router(components.pipeline), shutdown_signal()).await;

    components.store.close().await;
    info!("Relay stopped");
    served
}

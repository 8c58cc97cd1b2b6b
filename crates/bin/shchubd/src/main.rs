//! # shchubd: shchub daemon
//!
//! Composition root that wires the Bosch SHC integration and the HTTP API
//! together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`shchub.toml` plus environment overrides)
//! - Initialise `tracing` from the configured filter
//! - Construct the in-memory registries, the event bus and the application
//!   services
//! - Run the integration lifecycle: setup, background tasks, teardown
//! - Build the axum router and serve it until Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use shchub_adapter_bosch_shc::BoschShcIntegration;
use shchub_adapter_bosch_shc::session::simulated::SimulatedSession;
use shchub_adapter_http_axum::router;
use shchub_adapter_http_axum::state::AppState;
use shchub_app::event_bus::{DEFAULT_CAPACITY, InProcessEventBus};
use shchub_app::memory::{InMemoryDeviceRepository, InMemoryEntityRepository};
use shchub_app::ports::Integration;
use shchub_app::services::device_service::DeviceService;
use shchub_app::services::entity_service::EntityService;
use shchub_app::services::integration_context::ServiceContext;
use shchub_app::services::service_dispatch::ServiceDispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Registries and services
    let event_bus = InProcessEventBus::new(DEFAULT_CAPACITY);
    let entity_service = Arc::new(EntityService::new(
        InMemoryEntityRepository::default(),
        event_bus.clone(),
    ));
    let device_service = Arc::new(DeviceService::new(InMemoryDeviceRepository::default()));
    let ctx = ServiceContext::new(
        Arc::clone(&device_service),
        Arc::clone(&entity_service),
        event_bus.clone(),
    );

    // Integration
    let session = SimulatedSession::from_config(&config.bosch_shc.host, &config.bosch_shc.simulated)?;
    let mut integration = BoschShcIntegration::new(config.bosch_shc.clone(), session);
    if let Err(err) = integration.setup(&ctx).await {
        tracing::error!(error = %err, "failed to set up the Bosch SHC integration");
        return Err(err.into());
    }
    integration.start_background(ctx.clone()).await?;

    let mut dispatcher = ServiceDispatcher::new(
        Arc::clone(&entity_service),
        event_bus.clone(),
        integration.service_handler(),
    );
    dispatcher.register(integration.services());

    // HTTP
    let state = AppState::new(entity_service, device_service, Arc::new(dispatcher), event_bus);
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "shchubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    integration.teardown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for the shutdown signal");
    }
    tracing::info!("shutting down");
}

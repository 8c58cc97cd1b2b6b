//! Shared application state for axum handlers.

use std::sync::Arc;

use shchub_app::event_bus::InProcessEventBus;
use shchub_app::services::device_service::DeviceService;
use shchub_app::services::entity_service::EntityService;
use shchub_app::services::service_dispatch::ServiceDispatcher;

/// Application state shared across all axum handlers.
///
/// Generic over the repository types, the event publisher and the service
/// handler to avoid dynamic dispatch. `Clone` is implemented manually so the
/// underlying types themselves do not need to be `Clone`, only the `Arc`
/// wrappers are cloned.
pub struct AppState<ER, DR, EP, H> {
    pub entity_service: Arc<EntityService<ER, EP>>,
    pub device_service: Arc<DeviceService<DR>>,
    pub dispatcher: Arc<ServiceDispatcher<ER, EP, H>>,
    /// Bus the SSE stream subscribes to.
    pub event_bus: InProcessEventBus,
}

impl<ER, DR, EP, H> Clone for AppState<ER, DR, EP, H> {
    fn clone(&self) -> Self {
        Self {
            entity_service: Arc::clone(&self.entity_service),
            device_service: Arc::clone(&self.device_service),
            dispatcher: Arc::clone(&self.dispatcher),
            event_bus: self.event_bus.clone(),
        }
    }
}

impl<ER, DR, EP, H> AppState<ER, DR, EP, H> {
    /// Create the state from services already shared with the integration.
    pub fn new(
        entity_service: Arc<EntityService<ER, EP>>,
        device_service: Arc<DeviceService<DR>>,
        dispatcher: Arc<ServiceDispatcher<ER, EP, H>>,
        event_bus: InProcessEventBus,
    ) -> Self {
        Self {
            entity_service,
            device_service,
            dispatcher,
            event_bus,
        }
    }
}

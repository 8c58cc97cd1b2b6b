//! Integration port: lifecycle and service-call handling for device integrations.
//!
//! An integration bridges an external device layer (a smart home hub or a
//! simulated device set) into the shchub system. It registers
//! devices/entities on setup, keeps their state current in the background
//! and handles service calls directed at entities it owns.

use std::future::Future;

use shchub_domain::device::Device;
use shchub_domain::entity::Entity;
use shchub_domain::error::HubError;
use shchub_domain::event::Event;
use shchub_domain::service::ServiceDefinition;

/// Context provided to integrations for persisting discoveries.
///
/// This is a **port**: adapters call it to persist devices and entities
/// they discover. The binary crate provides a concrete implementation
/// backed by `DeviceService` and `EntityService`.
pub trait IntegrationContext: Send + Sync {
    /// Persist a device (create or update by `integration`+`unique_id`).
    fn upsert_device(&self, device: Device) -> impl Future<Output = Result<Device, HubError>> + Send;

    /// Persist an entity (create or update by `integration`+`unique_id`).
    ///
    /// Also publishes `EntityCreated` / `StateChanged` events through the
    /// event bus when appropriate (delegated to `EntityService`).
    fn upsert_entity(&self, entity: Entity) -> impl Future<Output = Result<Entity, HubError>> + Send;

    /// Look up a registered device by the unique id its integration gave it.
    fn find_device(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Device>, HubError>> + Send;

    /// Re-key an entity registered under a legacy unique id.
    ///
    /// Returns `true` when an entity was migrated.
    fn migrate_unique_id(
        &self,
        integration: &str,
        old_unique_id: &str,
        new_unique_id: &str,
    ) -> impl Future<Output = Result<bool, HubError>> + Send;

    /// Publish a domain event to the event bus.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Executes service calls against entities an integration owns.
///
/// Handlers are cheap to clone and shared with the HTTP layer, while the
/// owning [`Integration`] keeps exclusive control of its lifecycle.
pub trait ServiceHandler: Send + Sync {
    /// Run `service` against `entity` and return the entity's fresh snapshot.
    fn handle_service_call(
        &self,
        entity: &Entity,
        service: &ServiceDefinition,
        data: serde_json::Value,
    ) -> impl Future<Output = Result<Entity, HubError>> + Send;
}

/// A pluggable device integration.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup): connect and persist devices and entities
/// 2. [`start_background`](Self::start_background): spawn long-running tasks
/// 3. (the server runs, forwarding service calls to [`service_handler`](Self::service_handler))
/// 4. [`teardown`](Self::teardown): clean up resources
pub trait Integration {
    type Handler: ServiceHandler + Clone + 'static;

    /// Unique name identifying this integration (e.g. `"bosch_shc"`).
    fn name(&self) -> &'static str;

    /// Services this integration registers for its entities.
    fn services(&self) -> Vec<ServiceDefinition> {
        Vec::new()
    }

    /// Handle for executing service calls while the integration runs.
    fn service_handler(&self) -> Self::Handler;

    /// Initialise and persist everything known at startup via `ctx`.
    fn setup(
        &mut self,
        ctx: &impl IntegrationContext,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Start long-running background work (push handling, polling).
    ///
    /// Spawns internal tasks that persist updates via `ctx` and returns
    /// immediately. The default implementation is a no-op.
    fn start_background(
        &mut self,
        _ctx: impl IntegrationContext + Clone + 'static,
    ) -> impl Future<Output = Result<(), HubError>> + Send {
        async { Ok(()) }
    }

    /// Called on graceful shutdown. Clean up any background tasks or subscriptions.
    fn teardown(&mut self) -> impl Future<Output = Result<(), HubError>> + Send;
}

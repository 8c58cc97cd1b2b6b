//! Concrete [`IntegrationContext`] backed by application services.

use std::sync::Arc;

use shchub_domain::device::Device;
use shchub_domain::entity::Entity;
use shchub_domain::error::HubError;
use shchub_domain::event::Event;

use crate::ports::{DeviceRepository, EntityRepository, EventPublisher, IntegrationContext};
use crate::services::device_service::DeviceService;
use crate::services::entity_service::EntityService;

/// [`IntegrationContext`] implementation that delegates to `DeviceService`,
/// `EntityService`, and an `EventPublisher`.
///
/// Wraps `Arc`-ed services so it is cheaply cloneable and `Send + Sync`.
/// Integrations only ever see the [`IntegrationContext`] trait.
pub struct ServiceContext<DR, ER, EP> {
    device_service: Arc<DeviceService<DR>>,
    entity_service: Arc<EntityService<ER, EP>>,
    event_publisher: EP,
}

impl<DR, ER, EP> ServiceContext<DR, ER, EP> {
    /// Create a new context backed by the given services and event publisher.
    pub fn new(
        device_service: Arc<DeviceService<DR>>,
        entity_service: Arc<EntityService<ER, EP>>,
        event_publisher: EP,
    ) -> Self {
        Self {
            device_service,
            entity_service,
            event_publisher,
        }
    }
}

impl<DR, ER, EP: Clone> Clone for ServiceContext<DR, ER, EP> {
    fn clone(&self) -> Self {
        Self {
            device_service: Arc::clone(&self.device_service),
            entity_service: Arc::clone(&self.entity_service),
            event_publisher: self.event_publisher.clone(),
        }
    }
}

impl<DR, ER, EP> IntegrationContext for ServiceContext<DR, ER, EP>
where
    DR: DeviceRepository + Send + Sync + 'static,
    ER: EntityRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
{
    async fn upsert_device(&self, device: Device) -> Result<Device, HubError> {
        self.device_service.upsert_device(device).await
    }

    async fn upsert_entity(&self, entity: Entity) -> Result<Entity, HubError> {
        self.entity_service.upsert_entity(entity).await
    }

    async fn find_device(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> Result<Option<Device>, HubError> {
        self.device_service
            .find_by_unique_id(integration, unique_id)
            .await
    }

    async fn migrate_unique_id(
        &self,
        integration: &str,
        old_unique_id: &str,
        new_unique_id: &str,
    ) -> Result<bool, HubError> {
        self.entity_service
            .migrate_unique_id(integration, old_unique_id, new_unique_id)
            .await
    }

    async fn publish(&self, event: Event) -> Result<(), HubError> {
        self.event_publisher.publish(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::memory::{InMemoryDeviceRepository, InMemoryEntityRepository};
    use shchub_domain::entity::{EntityState, Platform};
    use shchub_domain::event::EventType;

    type TestContext =
        ServiceContext<InMemoryDeviceRepository, InMemoryEntityRepository, InProcessEventBus>;

    fn make_context() -> (TestContext, InProcessEventBus) {
        let bus = InProcessEventBus::new(16);
        let ctx = ServiceContext::new(
            Arc::new(DeviceService::new(InMemoryDeviceRepository::default())),
            Arc::new(EntityService::new(
                InMemoryEntityRepository::default(),
                bus.clone(),
            )),
            bus.clone(),
        );
        (ctx, bus)
    }

    fn leak_detector() -> Device {
        Device::builder()
            .name("Bathroom Leak")
            .integration("bosch_shc")
            .unique_id("hdm:ZigBee:leak")
            .build()
            .unwrap()
    }

    fn leak_entity(state: EntityState) -> Entity {
        Entity::builder()
            .unique_id("leak_serial")
            .integration("bosch_shc")
            .friendly_name("Bathroom Leak")
            .platform(Platform::BinarySensor)
            .state(state)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_keep_stored_device_id_across_registrations() {
        let (ctx, _bus) = make_context();
        let first = ctx.upsert_device(leak_detector()).await.unwrap();

        // a fresh snapshot carries a new id, the stored one must win
        let second = ctx.upsert_device(leak_detector()).await.unwrap();
        assert_eq!(first.id, second.id);

        let found = ctx
            .find_device("bosch_shc", "hdm:ZigBee:leak")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn should_refresh_entity_state_through_upsert() {
        let (ctx, bus) = make_context();
        let device = ctx.upsert_device(leak_detector()).await.unwrap();
        let mut entity = leak_entity(EntityState::Off);
        entity.device_id = device.id;
        let created = ctx.upsert_entity(entity).await.unwrap();
        let mut rx = bus.subscribe();

        let mut wet = leak_entity(EntityState::On);
        wet.device_id = device.id;
        let updated = ctx.upsert_entity(wet).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.device_id, device.id);
        assert_eq!(rx.recv().await.unwrap().event_type, EventType::StateChanged);
    }

    #[tokio::test]
    async fn should_forward_published_events_to_bus() {
        let (ctx, bus) = make_context();
        let mut rx = bus.subscribe();

        ctx.publish(Event::integration("bosch_shc.event", serde_json::json!({})))
            .await
            .unwrap();

        assert!(rx.recv().await.unwrap().is_integration_event("bosch_shc.event"));
    }
}

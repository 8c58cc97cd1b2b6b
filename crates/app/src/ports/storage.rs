//! Storage ports: registries for entities and devices.

use std::future::Future;

use shchub_domain::device::Device;
use shchub_domain::entity::Entity;
use shchub_domain::error::HubError;
use shchub_domain::id::{DeviceId, EntityId};

/// Registry of [`Entity`]s.
pub trait EntityRepository {
    fn create(&self, entity: Entity) -> impl Future<Output = Result<Entity, HubError>> + Send;

    fn get_by_id(
        &self,
        id: EntityId,
    ) -> impl Future<Output = Result<Option<Entity>, HubError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Entity>, HubError>> + Send;

    fn find_by_device_id(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Entity>, HubError>> + Send;

    /// Find the entity an integration registered under `unique_id`.
    fn find_by_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Entity>, HubError>> + Send;

    fn update(&self, entity: Entity) -> impl Future<Output = Result<Entity, HubError>> + Send;

    fn delete(&self, id: EntityId) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Registry of [`Device`]s.
pub trait DeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, HubError>> + Send;

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, HubError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, HubError>> + Send;

    /// Find the device an integration registered under `unique_id`.
    fn find_by_integration_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Device>, HubError>> + Send;

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, HubError>> + Send;

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), HubError>> + Send;
}

//! In-memory registries for entities and devices.
//!
//! The hub keeps its registries in process memory; integrations re-register
//! everything they know on every start.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use shchub_domain::device::Device;
use shchub_domain::entity::Entity;
use shchub_domain::error::{HubError, NotFoundError};
use shchub_domain::id::{DeviceId, EntityId};

use crate::ports::{DeviceRepository, EntityRepository};

/// A thread panicked while holding a registry lock.
#[derive(Debug, thiserror::Error)]
#[error("{0} registry lock poisoned")]
struct PoisonedRegistry(&'static str);

fn lock<'a, T>(mutex: &'a Mutex<T>, registry: &'static str) -> Result<MutexGuard<'a, T>, HubError> {
    mutex
        .lock()
        .map_err(|_| HubError::Storage(Box::new(PoisonedRegistry(registry))))
}

/// [`EntityRepository`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryEntityRepository {
    store: Mutex<HashMap<EntityId, Entity>>,
}

impl EntityRepository for InMemoryEntityRepository {
    fn create(&self, entity: Entity) -> impl Future<Output = Result<Entity, HubError>> + Send {
        let result = lock(&self.store, "entity").map(|mut store| {
            store.insert(entity.id, entity.clone());
            entity
        });
        async { result }
    }

    fn get_by_id(
        &self,
        id: EntityId,
    ) -> impl Future<Output = Result<Option<Entity>, HubError>> + Send {
        let result = lock(&self.store, "entity").map(|store| store.get(&id).cloned());
        async { result }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Entity>, HubError>> + Send {
        let result = lock(&self.store, "entity").map(|store| {
            let mut all: Vec<Entity> = store.values().cloned().collect();
            all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
            all
        });
        async { result }
    }

    fn find_by_device_id(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Entity>, HubError>> + Send {
        let result = lock(&self.store, "entity").map(|store| {
            store
                .values()
                .filter(|ent| ent.device_id == device_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        async { result }
    }

    fn find_by_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Entity>, HubError>> + Send {
        let result = lock(&self.store, "entity").map(|store| {
            store
                .values()
                .find(|ent| ent.integration == integration && ent.unique_id == unique_id)
                .cloned()
        });
        async { result }
    }

    fn update(&self, entity: Entity) -> impl Future<Output = Result<Entity, HubError>> + Send {
        let result = lock(&self.store, "entity").and_then(|mut store| {
            if !store.contains_key(&entity.id) {
                return Err(NotFoundError {
                    entity: "Entity",
                    id: entity.id.to_string(),
                }
                .into());
            }
            store.insert(entity.id, entity.clone());
            Ok(entity)
        });
        async { result }
    }

    fn delete(&self, id: EntityId) -> impl Future<Output = Result<(), HubError>> + Send {
        let result = lock(&self.store, "entity").map(|mut store| {
            store.remove(&id);
        });
        async { result }
    }
}

/// [`DeviceRepository`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    store: Mutex<HashMap<DeviceId, Device>>,
}

impl DeviceRepository for InMemoryDeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, HubError>> + Send {
        let result = lock(&self.store, "device").map(|mut store| {
            store.insert(device.id, device.clone());
            device
        });
        async { result }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, HubError>> + Send {
        let result = lock(&self.store, "device").map(|store| store.get(&id).cloned());
        async { result }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, HubError>> + Send {
        let result = lock(&self.store, "device").map(|store| {
            let mut all: Vec<Device> = store.values().cloned().collect();
            all.sort_by(|a, b| a.name.cmp(&b.name));
            all
        });
        async { result }
    }

    fn find_by_integration_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Device>, HubError>> + Send {
        let result = lock(&self.store, "device").map(|store| {
            store
                .values()
                .find(|d| d.integration == integration && d.unique_id == unique_id)
                .cloned()
        });
        async { result }
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, HubError>> + Send {
        let result = lock(&self.store, "device").and_then(|mut store| {
            if !store.contains_key(&device.id) {
                return Err(NotFoundError {
                    entity: "Device",
                    id: device.id.to_string(),
                }
                .into());
            }
            store.insert(device.id, device.clone());
            Ok(device)
        });
        async { result }
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), HubError>> + Send {
        let result = lock(&self.store, "device").map(|mut store| {
            store.remove(&id);
        });
        async { result }
    }
}

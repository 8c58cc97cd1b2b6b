//! Device registry use-cases.
//!
//! Devices are keyed by `(integration, unique_id)`. Integrations register
//! the same devices on every start, so registration is idempotent and keeps
//! the first [`DeviceId`] handed out.

use shchub_domain::device::Device;
use shchub_domain::error::{HubError, NotFoundError};
use shchub_domain::id::DeviceId;

use crate::ports::DeviceRepository;

pub struct DeviceService<R> {
    repo: R,
}

impl<R: DeviceRepository> DeviceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register `device`, or refresh the record already stored under its
    /// `(integration, unique_id)`.
    ///
    /// The stored record is returned untouched when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, device), fields(integration = %device.integration, unique_id = %device.unique_id))]
    pub async fn upsert_device(&self, device: Device) -> Result<Device, HubError> {
        device.validate()?;
        let existing = self
            .repo
            .find_by_integration_unique_id(&device.integration, &device.unique_id)
            .await?;
        match existing {
            None => {
                tracing::debug!(name = %device.name, "registering device");
                self.repo.create(device).await
            }
            Some(stored) => {
                let refreshed = Device {
                    id: stored.id,
                    ..device
                };
                if refreshed == stored {
                    return Ok(stored);
                }
                tracing::debug!(name = %refreshed.name, "refreshing device");
                self.repo.update(refreshed).await
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no device with `id` exists,
    /// or a storage error from the repository.
    pub async fn get_device(&self, id: DeviceId) -> Result<Device, HubError> {
        match self.repo.get_by_id(id).await? {
            Some(device) => Ok(device),
            None => Err(NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()),
        }
    }

    /// Device registered by `integration` under `unique_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn find_by_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> Result<Option<Device>, HubError> {
        self.repo
            .find_by_integration_unique_id(integration, unique_id)
            .await
    }

    /// All devices, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_devices(&self) -> Result<Vec<Device>, HubError> {
        self.repo.get_all().await
    }

    /// Devices attached to the hub registered as `hub_unique_id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_children(
        &self,
        integration: &str,
        hub_unique_id: &str,
    ) -> Result<Vec<Device>, HubError> {
        let mut devices = self.repo.get_all().await?;
        devices.retain(|d| {
            d.integration == integration && d.via_device.as_deref() == Some(hub_unique_id)
        });
        Ok(devices)
    }
}

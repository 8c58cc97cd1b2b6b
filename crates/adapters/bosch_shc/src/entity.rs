//! Common behaviour of every controller entity and its mapping to the
//! domain model.

use std::collections::HashMap;

use shchub_domain::device::Device;
use shchub_domain::entity::{
    AttributeValue, DeviceClass, Entity, EntityCategory, EntityState, Platform, StateClass,
};
use shchub_domain::error::HubError;
use shchub_domain::id::DeviceId;

use crate::DOMAIN;
use crate::information::HubIdentity;
use crate::session::{STATUS_AVAILABLE, ShcDevice};

/// An entity backed by one controller device.
///
/// Name and unique id default to the device name and serial; entities that
/// share a device override them with a suffix.
pub trait ShcEntity: Send + Sync {
    fn device(&self) -> &dyn ShcDevice;

    fn platform(&self) -> Platform;

    fn name(&self) -> String {
        self.device().name()
    }

    fn unique_id(&self) -> String {
        self.device().serial().to_string()
    }

    fn state(&self) -> EntityState;

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::new()
    }

    fn device_class(&self) -> Option<DeviceClass> {
        None
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        None
    }

    fn state_class(&self) -> Option<StateClass> {
        None
    }

    fn icon(&self) -> Option<&'static str> {
        None
    }

    fn entity_category(&self) -> Option<EntityCategory> {
        None
    }

    /// Whether the state must be re-read periodically instead of on push.
    fn should_poll(&self) -> bool {
        false
    }

    fn available(&self) -> bool {
        self.device().status() == STATUS_AVAILABLE
    }

    /// Build the domain [`Entity`] for the current device state.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when the device reports an empty
    /// name or serial.
    fn snapshot(&self, device_id: DeviceId) -> Result<Entity, HubError> {
        let state = if self.available() {
            self.state()
        } else {
            EntityState::Unavailable
        };
        Entity::builder()
            .device_id(device_id)
            .unique_id(self.unique_id())
            .integration(DOMAIN)
            .friendly_name(self.name())
            .platform(self.platform())
            .state(state)
            .attributes(self.attributes())
            .device_class(self.device_class())
            .unit_of_measurement(self.unit_of_measurement())
            .state_class(self.state_class())
            .icon(self.icon())
            .entity_category(self.entity_category())
            .build()
    }
}

/// Host device describing the controller itself.
///
/// # Errors
///
/// Returns [`HubError::Validation`] when the identity is empty.
pub fn hub_device(identity: &HubIdentity) -> Result<Device, HubError> {
    Device::builder()
        .name(&identity.name)
        .manufacturer("Bosch")
        .model("SmartHomeController")
        .integration(DOMAIN)
        .unique_id(&identity.unique_id)
        .build()
}

/// Host device for a controller device, attached to the hub.
///
/// # Errors
///
/// Returns [`HubError::Validation`] when the device has no name or id.
pub fn shc_device(device: &dyn ShcDevice, hub_unique_id: &str) -> Result<Device, HubError> {
    Device::builder()
        .name(device.name())
        .manufacturer(device.manufacturer())
        .model(device.device_model())
        .integration(DOMAIN)
        .unique_id(device.id())
        .via_device(hub_unique_id)
        .build()
}

//! Entity: the central state-holding concept.
//!
//! An entity represents a single observable aspect of a device (a window
//! contact's open/closed state, a thermostat's temperature reading, …).

mod attribute_value;
mod class;
mod state;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use attribute_value::AttributeValue;
pub use class::{
    DeviceClass, EntityCategory, Platform, StateClass, UNIT_CELSIUS, UNIT_KILO_WATT_HOUR,
    UNIT_PARTS_PER_MILLION, UNIT_PERCENTAGE, UNIT_WATT,
};
pub use state::EntityState;

use crate::error::{HubError, ValidationError};
use crate::id::{DeviceId, EntityId};
use crate::time::{Timestamp, now};

/// A single observable aspect of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub device_id: DeviceId,
    /// Human-facing identifier, e.g. `binary_sensor.hallway_window`.
    pub entity_id: String,
    /// Stable identifier assigned by the integration, e.g. a device serial.
    pub unique_id: String,
    pub integration: String,
    pub friendly_name: String,
    pub platform: Platform,
    pub state: EntityState,
    pub attributes: HashMap<String, AttributeValue>,
    pub device_class: Option<DeviceClass>,
    pub unit_of_measurement: Option<String>,
    pub state_class: Option<StateClass>,
    pub icon: Option<String>,
    pub entity_category: Option<EntityCategory>,
    pub last_changed: Timestamp,
    pub last_updated: Timestamp,
}

impl Entity {
    /// Create a builder for constructing an [`Entity`].
    #[must_use]
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `entity_id`, `unique_id`,
    /// `integration` or `friendly_name` is empty, or when `entity_id` is
    /// not prefixed by the entity's platform.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.entity_id.is_empty() {
            return Err(ValidationError::EmptyEntityId.into());
        }
        match self.entity_id.split_once('.') {
            Some((prefix, object_id)) if prefix == self.platform.as_str() && !object_id.is_empty() => {}
            _ => return Err(ValidationError::MalformedEntityId(self.entity_id.clone()).into()),
        }
        if self.unique_id.is_empty() {
            return Err(ValidationError::EmptyUniqueId.into());
        }
        if self.integration.is_empty() {
            return Err(ValidationError::EmptyIntegration.into());
        }
        if self.friendly_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Look up an attribute by key.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Apply a freshly read state.
    ///
    /// `last_updated` always moves; `last_changed` only moves when the
    /// state differs from the previous one.
    pub fn update_state(&mut self, state: EntityState, at: Timestamp) {
        if self.state != state {
            self.last_changed = at;
        }
        self.state = state;
        self.last_updated = at;
    }
}

/// Build a `<platform>.<object_id>` identifier from a display name.
///
/// Non-alphanumeric runs collapse into a single `_`.
#[must_use]
pub fn make_entity_id(platform: Platform, name: &str) -> String {
    let mut object_id = String::with_capacity(name.len());
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            object_id.push(ch);
        } else if !object_id.is_empty() && !object_id.ends_with('_') {
            object_id.push('_');
        }
    }
    while object_id.ends_with('_') {
        object_id.pop();
    }
    if object_id.is_empty() {
        object_id.push_str("unnamed");
    }
    format!("{platform}.{object_id}")
}

/// Step-by-step builder for [`Entity`].
#[derive(Debug, Default)]
pub struct EntityBuilder {
    id: Option<EntityId>,
    device_id: Option<DeviceId>,
    entity_id: Option<String>,
    unique_id: Option<String>,
    integration: Option<String>,
    friendly_name: Option<String>,
    platform: Option<Platform>,
    state: EntityState,
    attributes: HashMap<String, AttributeValue>,
    device_class: Option<DeviceClass>,
    unit_of_measurement: Option<String>,
    state_class: Option<StateClass>,
    icon: Option<String>,
    entity_category: Option<EntityCategory>,
}

impl EntityBuilder {
    #[must_use]
    pub fn id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Explicit `entity_id`; derived from the friendly name when omitted.
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    #[must_use]
    pub fn integration(mut self, integration: impl Into<String>) -> Self {
        self.integration = Some(integration.into());
        self
    }

    #[must_use]
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn state(mut self, state: EntityState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: HashMap<String, AttributeValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    #[must_use]
    pub fn device_class(mut self, device_class: Option<DeviceClass>) -> Self {
        self.device_class = device_class;
        self
    }

    #[must_use]
    pub fn unit_of_measurement(mut self, unit: Option<&str>) -> Self {
        self.unit_of_measurement = unit.map(str::to_string);
        self
    }

    #[must_use]
    pub fn state_class(mut self, state_class: Option<StateClass>) -> Self {
        self.state_class = state_class;
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: Option<&str>) -> Self {
        self.icon = icon.map(str::to_string);
        self
    }

    #[must_use]
    pub fn entity_category(mut self, category: Option<EntityCategory>) -> Self {
        self.entity_category = category;
        self
    }

    /// Consume the builder, validate, and return an [`Entity`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if a required field is missing or
    /// empty.
    pub fn build(self) -> Result<Entity, HubError> {
        let platform = self.platform.unwrap_or(Platform::Sensor);
        let friendly_name = self.friendly_name.unwrap_or_default();
        let entity_id = self
            .entity_id
            .unwrap_or_else(|| make_entity_id(platform, &friendly_name));
        let ts = now();
        let entity = Entity {
            id: self.id.unwrap_or_default(),
            device_id: self.device_id.unwrap_or_default(),
            entity_id,
            unique_id: self.unique_id.unwrap_or_default(),
            integration: self.integration.unwrap_or_default(),
            friendly_name,
            platform,
            state: self.state,
            attributes: self.attributes,
            device_class: self.device_class,
            unit_of_measurement: self.unit_of_measurement,
            state_class: self.state_class,
            icon: self.icon,
            entity_category: self.entity_category,
            last_changed: ts,
            last_updated: ts,
        };
        entity.validate()?;
        Ok(entity)
    }
}

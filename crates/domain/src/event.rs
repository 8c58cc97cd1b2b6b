//! Event: an immutable record of something that happened.
//!
//! Events are produced when entities are created or change state, when
//! services are called, and when an integration forwards a device event
//! (a motion trigger, a smoke alarm).

use serde::{Deserialize, Serialize};

use crate::id::{EntityId, EventId};
use crate::time::{Timestamp, now};

/// The kind of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EntityCreated,
    StateChanged,
    ServiceCalled,
    /// A device event forwarded by an integration, named by
    /// [`Event::name`] (e.g. `bosch_shc.event`).
    Integration,
}

/// An immutable record of something that happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub name: Option<String>,
    pub entity_id: Option<EntityId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, entity_id: Option<EntityId>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            name: None,
            entity_id,
            data,
            timestamp: now(),
        }
    }

    /// Create a named integration event.
    #[must_use]
    pub fn integration(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(EventType::Integration, None, data)
        }
    }

    /// Whether this is the integration event called `name`.
    #[must_use]
    pub fn is_integration_event(&self, name: &str) -> bool {
        self.event_type == EventType::Integration && self.name.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_create_unnamed_event() {
        let entity_id = EntityId::new();
        let event = Event::new(
            EventType::StateChanged,
            Some(entity_id),
            serde_json::json!({"from": "off", "to": "on"}),
        );
        assert_eq!(event.entity_id, Some(entity_id));
        assert!(event.name.is_none());
    }

    #[test]
    fn should_create_named_integration_event() {
        let event = Event::integration("bosch_shc.event", serde_json::json!({"event_type": "MOTION"}));
        assert!(event.is_integration_event("bosch_shc.event"));
        assert!(!event.is_integration_event("other.event"));
        assert_eq!(event.data["event_type"], "MOTION");
    }

    #[test]
    fn should_serialize_event_type_in_snake_case() {
        let json = serde_json::to_value(EventType::ServiceCalled).unwrap();
        assert_eq!(json, "service_called");
    }
}

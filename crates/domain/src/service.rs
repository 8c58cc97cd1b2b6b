//! Service: a callable command exposed by an integration.
//!
//! Examples: `bosch_shc.smokedetector_check`,
//! `bosch_shc.smokedetector_alarmstate`.

use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::EntityId;

/// A service an integration registers for its entities, with the schema of
/// the fields it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    /// Owning integration, e.g. `bosch_shc`.
    pub domain: &'static str,
    pub name: &'static str,
    /// Fields that must be present as strings in the call data.
    pub required_string_fields: &'static [&'static str],
}

impl ServiceDefinition {
    /// `<domain>.<name>`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.domain, self.name)
    }

    /// Whether `service` names this definition, either bare or qualified.
    #[must_use]
    pub fn matches(&self, service: &str) -> bool {
        match service.split_once('.') {
            Some((domain, name)) => domain == self.domain && name == self.name,
            None => service == self.name,
        }
    }

    /// Check the call data against the field schema.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when a required field is absent or
    /// not a string.
    pub fn validate(&self, data: &serde_json::Value) -> Result<(), HubError> {
        for &field in self.required_string_fields {
            match data.get(field) {
                None | Some(serde_json::Value::Null) => {
                    return Err(ValidationError::MissingServiceField { field }.into());
                }
                Some(serde_json::Value::String(_)) => {}
                Some(_) => return Err(ValidationError::InvalidServiceField { field }.into()),
            }
        }
        Ok(())
    }
}

/// A request to run a service against one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub entity_id: EntityId,
    pub service: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALARM_STATE: ServiceDefinition = ServiceDefinition {
        domain: "bosch_shc",
        name: "smokedetector_alarmstate",
        required_string_fields: &["command"],
    };

    #[test]
    fn should_match_bare_and_qualified_names() {
        assert!(ALARM_STATE.matches("smokedetector_alarmstate"));
        assert!(ALARM_STATE.matches("bosch_shc.smokedetector_alarmstate"));
        assert!(!ALARM_STATE.matches("other.smokedetector_alarmstate"));
        assert!(!ALARM_STATE.matches("smokedetector_check"));
        assert_eq!(ALARM_STATE.qualified_name(), "bosch_shc.smokedetector_alarmstate");
    }

    #[test]
    fn should_accept_data_with_required_string_field() {
        let data = serde_json::json!({"command": "INTRUSION_ALARM_ON_REQUESTED"});
        assert!(ALARM_STATE.validate(&data).is_ok());
    }

    #[test]
    fn should_reject_missing_required_field() {
        let result = ALARM_STATE.validate(&serde_json::json!({}));
        assert!(matches!(
            result,
            Err(HubError::Validation(ValidationError::MissingServiceField { field: "command" }))
        ));
    }

    #[test]
    fn should_reject_non_string_required_field() {
        let result = ALARM_STATE.validate(&serde_json::json!({"command": 3}));
        assert!(matches!(
            result,
            Err(HubError::Validation(ValidationError::InvalidServiceField { field: "command" }))
        ));
    }
}

//! Smoke detector services.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use shchub_app::ports::ServiceHandler;
use shchub_domain::entity::Entity;
use shchub_domain::error::{HubError, ServiceError, ValidationError};
use shchub_domain::service::ServiceDefinition;

use crate::DOMAIN;
use crate::binary_sensor::SmokeDetectorSensor;
use crate::entity::ShcEntity;
use crate::error::ShcError;
use crate::session::SmokeDetector;
use crate::session::states::{AlarmCommand, UnknownState};

const CHECK: &str = "smokedetector_check";
const ALARM_STATE: &str = "smokedetector_alarmstate";

/// Request a smoke test on the target detector.
pub const SMOKEDETECTOR_CHECK: ServiceDefinition = ServiceDefinition {
    domain: DOMAIN,
    name: CHECK,
    required_string_fields: &[],
};

/// Send an alarm command (`command` field) to the target detector.
pub const SMOKEDETECTOR_ALARMSTATE: ServiceDefinition = ServiceDefinition {
    domain: DOMAIN,
    name: ALARM_STATE,
    required_string_fields: &["command"],
};

#[must_use]
pub fn definitions() -> Vec<ServiceDefinition> {
    vec![SMOKEDETECTOR_CHECK, SMOKEDETECTOR_ALARMSTATE]
}

/// Parse the `command` field of an alarm state call.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownAlarmCommand`] for names the
/// controller does not accept.
pub fn parse_alarm_command(raw: &str) -> Result<AlarmCommand, HubError> {
    raw.parse()
        .map_err(|err: UnknownState| ValidationError::UnknownAlarmCommand(err.value).into())
}

/// Runs the smoke detector services against the detectors registered
/// during setup, keyed by entity unique id.
#[derive(Clone, Default)]
pub struct ShcServiceHandler {
    detectors: Arc<RwLock<HashMap<String, Arc<dyn SmokeDetector>>>>,
}

impl ShcServiceHandler {
    pub fn register(&self, unique_id: impl Into<String>, detector: Arc<dyn SmokeDetector>) {
        self.detectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(unique_id.into(), detector);
    }

    pub fn clear(&self) {
        self.detectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn detector(&self, unique_id: &str) -> Option<Arc<dyn SmokeDetector>> {
        self.detectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(unique_id)
            .cloned()
    }
}

async fn run_blocking(
    call: impl FnOnce() -> Result<(), ShcError> + Send + 'static,
) -> Result<(), HubError> {
    tokio::task::spawn_blocking(call)
        .await
        .map_err(ShcError::from)
        .and_then(|result| result)
        .map_err(ShcError::into_domain)
}

impl ServiceHandler for ShcServiceHandler {
    async fn handle_service_call(
        &self,
        entity: &Entity,
        service: &ServiceDefinition,
        data: serde_json::Value,
    ) -> Result<Entity, HubError> {
        let unsupported = || -> HubError {
            ServiceError::Unsupported {
                service: service.qualified_name(),
                entity_id: entity.entity_id.clone(),
            }
            .into()
        };
        let detector = self.detector(&entity.unique_id).ok_or_else(unsupported)?;

        let target = Arc::clone(&detector);
        match service.name {
            CHECK => {
                tracing::debug!(entity = %entity.entity_id, "requesting smoke test");
                run_blocking(move || target.request_smoke_test()).await?;
            }
            ALARM_STATE => {
                let raw = data
                    .get("command")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                let command = parse_alarm_command(raw)?;
                tracing::debug!(entity = %entity.entity_id, %command, "setting alarm state");
                run_blocking(move || target.set_alarm_state(command)).await?;
            }
            _ => return Err(unsupported()),
        }

        SmokeDetectorSensor::new(detector).snapshot(entity.device_id)
    }
}

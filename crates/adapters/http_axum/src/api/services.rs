//! JSON handlers for integration services.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use shchub_app::ports::{DeviceRepository, EntityRepository, EventPublisher, ServiceHandler};
use shchub_domain::entity::Entity;
use shchub_domain::service::{ServiceCall, ServiceDefinition};

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for calling a service.
#[derive(Deserialize)]
pub struct CallServiceRequest {
    pub entity_id: String,
    /// Bare (`smokedetector_check`) or qualified
    /// (`bosch_shc.smokedetector_check`) service name.
    pub service: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `GET /api/services`
pub async fn list<ER, DR, EP, H>(
    State(state): State<AppState<ER, DR, EP, H>>,
) -> Json<Vec<ServiceDefinition>>
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    Json(state.dispatcher.definitions().to_vec())
}

/// `POST /api/services/call`
///
/// Answers with the target entity as refreshed by the service.
pub async fn call<ER, DR, EP, H>(
    State(state): State<AppState<ER, DR, EP, H>>,
    Json(req): Json<CallServiceRequest>,
) -> Result<Json<Entity>, ApiError>
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    let call = ServiceCall {
        entity_id: parse_id(&req.entity_id)?,
        service: req.service,
        data: req.data,
    };
    let entity = state.dispatcher.call(call).await?;
    Ok(Json(entity))
}

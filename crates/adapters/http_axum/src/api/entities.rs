//! JSON handlers for entities.

use axum::Json;
use axum::extract::{Path, State};

use shchub_app::ports::{DeviceRepository, EntityRepository, EventPublisher, ServiceHandler};
use shchub_domain::entity::Entity;
use shchub_domain::id::EntityId;

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/entities`
pub async fn list<ER, DR, EP, H>(
    State(state): State<AppState<ER, DR, EP, H>>,
) -> Result<Json<Vec<Entity>>, ApiError>
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    let entities = state.entity_service.list_entities().await?;
    Ok(Json(entities))
}

/// `GET /api/entities/{id}`
pub async fn get<ER, DR, EP, H>(
    State(state): State<AppState<ER, DR, EP, H>>,
    Path(id): Path<String>,
) -> Result<Json<Entity>, ApiError>
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    let entity_id: EntityId = parse_id(&id)?;
    let entity = state.entity_service.get_entity(entity_id).await?;
    Ok(Json(entity))
}

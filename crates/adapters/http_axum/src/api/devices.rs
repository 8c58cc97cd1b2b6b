//! JSON handlers for devices.

use axum::Json;
use axum::extract::State;

use shchub_app::ports::{DeviceRepository, EntityRepository, EventPublisher, ServiceHandler};
use shchub_domain::device::Device;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/devices`
pub async fn list<ER, DR, EP, H>(
    State(state): State<AppState<ER, DR, EP, H>>,
) -> Result<Json<Vec<Device>>, ApiError>
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    let devices = state.device_service.list_devices().await?;
    Ok(Json(devices))
}

//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod entities;
#[allow(clippy::missing_errors_doc)]
pub mod services;
pub mod sse;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post};

use shchub_app::ports::{DeviceRepository, EntityRepository, EventPublisher, ServiceHandler};
use shchub_domain::error::{HubError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<ER, DR, EP, H>() -> Router<AppState<ER, DR, EP, H>>
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    Router::new()
        .route("/entities", get(entities::list::<ER, DR, EP, H>))
        .route("/entities/{id}", get(entities::get::<ER, DR, EP, H>))
        .route("/devices", get(devices::list::<ER, DR, EP, H>))
        .route("/services", get(services::list::<ER, DR, EP, H>))
        .route("/services/call", post(services::call::<ER, DR, EP, H>))
        .route("/events/stream", get(sse::stream::<ER, DR, EP, H>))
}

/// Parse a path or body identifier, answering 400 when it is not a UUID.
pub(crate) fn parse_id<T: FromStr<Err = ValidationError>>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|err| ApiError::from(HubError::from(err)))
}

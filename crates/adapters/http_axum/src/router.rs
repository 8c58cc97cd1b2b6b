//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use shchub_app::ports::{DeviceRepository, EntityRepository, EventPublisher, ServiceHandler};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the JSON API under `/api` and includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build<ER, DR, EP, H>(state: AppState<ER, DR, EP, H>) -> Router
where
    ER: EntityRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    H: ServiceHandler + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use shchub_app::event_bus::InProcessEventBus;
    use shchub_app::memory::{InMemoryDeviceRepository, InMemoryEntityRepository};
    use shchub_app::services::device_service::DeviceService;
    use shchub_app::services::entity_service::EntityService;
    use shchub_app::services::service_dispatch::ServiceDispatcher;
    use shchub_domain::device::Device;
    use shchub_domain::entity::{Entity, EntityState, Platform};
    use shchub_domain::error::HubError;
    use shchub_domain::event::EventType;
    use shchub_domain::service::ServiceDefinition;

    const CHECK: ServiceDefinition = ServiceDefinition {
        domain: "bosch_shc",
        name: "smokedetector_check",
        required_string_fields: &[],
    };

    const ALARM_STATE: ServiceDefinition = ServiceDefinition {
        domain: "bosch_shc",
        name: "smokedetector_alarmstate",
        required_string_fields: &["command"],
    };

    /// Switches the target entity on.
    #[derive(Clone)]
    struct AlarmHandler;

    impl ServiceHandler for AlarmHandler {
        async fn handle_service_call(
            &self,
            entity: &Entity,
            _service: &ServiceDefinition,
            _data: serde_json::Value,
        ) -> Result<Entity, HubError> {
            let mut entity = entity.clone();
            entity.state = EntityState::On;
            Ok(entity)
        }
    }

    type TestState =
        AppState<InMemoryEntityRepository, InMemoryDeviceRepository, InProcessEventBus, AlarmHandler>;

    fn test_state() -> TestState {
        let bus = InProcessEventBus::new(16);
        let entities = Arc::new(EntityService::new(
            InMemoryEntityRepository::default(),
            bus.clone(),
        ));
        let devices = Arc::new(DeviceService::new(InMemoryDeviceRepository::default()));
        let mut dispatcher = ServiceDispatcher::new(Arc::clone(&entities), bus.clone(), AlarmHandler);
        dispatcher.register([CHECK, ALARM_STATE]);
        AppState::new(entities, devices, Arc::new(dispatcher), bus)
    }

    async fn seed_smoke_detector(state: &TestState) -> Entity {
        let device = state
            .device_service
            .upsert_device(
                Device::builder()
                    .name("Kitchen Smoke")
                    .integration("bosch_shc")
                    .unique_id("hdm:ZigBee:sd")
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap();
        state
            .entity_service
            .create_entity(
                Entity::builder()
                    .device_id(device.id)
                    .unique_id("SD001")
                    .integration("bosch_shc")
                    .friendly_name("Kitchen Smoke")
                    .platform(Platform::BinarySensor)
                    .state(EntityState::Off)
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let response = send(build(test_state()), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_list_entities_and_devices() {
        let state = test_state();
        seed_smoke_detector(&state).await;
        let app = build(state);

        let entities = json_body(send(app.clone(), get("/api/entities")).await).await;
        assert_eq!(entities[0]["entity_id"], "binary_sensor.kitchen_smoke");

        let devices = json_body(send(app, get("/api/devices")).await).await;
        assert_eq!(devices[0]["unique_id"], "hdm:ZigBee:sd");
    }

    #[tokio::test]
    async fn should_get_entity_by_id() {
        let state = test_state();
        let entity = seed_smoke_detector(&state).await;

        let response = send(build(state), get(&format!("/api/entities/{}", entity.id))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["unique_id"], "SD001");
    }

    #[tokio::test]
    async fn should_answer_not_found_for_missing_entity() {
        let response = send(
            build(test_state()),
            get("/api/entities/00000000-0000-0000-0000-000000000000"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn should_answer_bad_request_for_malformed_id() {
        let response = send(build(test_state()), get("/api/entities/not-a-uuid")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_list_registered_services() {
        let body = json_body(send(build(test_state()), get("/api/services")).await).await;
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[1]["required_string_fields"], serde_json::json!(["command"]));
    }

    #[tokio::test]
    async fn should_call_service_and_return_refreshed_entity() {
        let state = test_state();
        let entity = seed_smoke_detector(&state).await;
        let mut events = state.event_bus.subscribe();

        let response = send(
            build(state),
            post_json(
                "/api/services/call",
                &serde_json::json!({
                    "entity_id": entity.id.to_string(),
                    "service": "bosch_shc.smokedetector_check",
                }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["state"]["kind"], "on");
        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.event_type);
        }
        assert!(kinds.contains(&EventType::ServiceCalled));
    }

    #[tokio::test]
    async fn should_reject_service_call_missing_required_field() {
        let state = test_state();
        let entity = seed_smoke_detector(&state).await;

        let response = send(
            build(state),
            post_json(
                "/api/services/call",
                &serde_json::json!({
                    "entity_id": entity.id.to_string(),
                    "service": "smokedetector_alarmstate",
                    "data": {},
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_answer_not_found_for_unknown_service() {
        let state = test_state();
        let entity = seed_smoke_detector(&state).await;

        let response = send(
            build(state),
            post_json(
                "/api/services/call",
                &serde_json::json!({
                    "entity_id": entity.id.to_string(),
                    "service": "bosch_shc.self_destruct",
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_open_event_stream() {
        let response = send(build(test_state()), get("/api/events/stream")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
    }
}

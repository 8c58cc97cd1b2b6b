//! Service dispatch: routes user service calls to the owning integration.

use std::sync::Arc;

use shchub_domain::entity::Entity;
use shchub_domain::error::{HubError, ServiceError};
use shchub_domain::event::{Event, EventType};
use shchub_domain::service::{ServiceCall, ServiceDefinition};

use crate::ports::{EntityRepository, EventPublisher, ServiceHandler};
use crate::services::entity_service::EntityService;

/// Validates [`ServiceCall`]s against the registered definitions and
/// forwards them to the integration's [`ServiceHandler`].
pub struct ServiceDispatcher<ER, EP, H> {
    entity_service: Arc<EntityService<ER, EP>>,
    publisher: EP,
    handler: H,
    definitions: Vec<ServiceDefinition>,
}

impl<ER, EP, H> ServiceDispatcher<ER, EP, H>
where
    ER: EntityRepository + Send + Sync,
    EP: EventPublisher + Send + Sync,
    H: ServiceHandler,
{
    /// Create a dispatcher with no registered services.
    pub fn new(entity_service: Arc<EntityService<ER, EP>>, publisher: EP, handler: H) -> Self {
        Self {
            entity_service,
            publisher,
            handler,
            definitions: Vec::new(),
        }
    }

    /// Register the services an integration exposes.
    pub fn register(&mut self, definitions: impl IntoIterator<Item = ServiceDefinition>) {
        for definition in definitions {
            tracing::debug!(service = %definition.qualified_name(), "registering service");
            self.definitions.push(definition);
        }
    }

    /// All registered services.
    pub fn definitions(&self) -> &[ServiceDefinition] {
        &self.definitions
    }

    /// Run a service call and return the target entity's refreshed snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unknown`] for unregistered services,
    /// [`ServiceError::Unsupported`] when the entity belongs to another
    /// integration, [`HubError::Validation`] when the data does not match
    /// the service schema, [`HubError::NotFound`] for unknown entities, or
    /// whatever the handler reports.
    #[tracing::instrument(skip(self, call), fields(service = %call.service, entity = %call.entity_id))]
    pub async fn call(&self, call: ServiceCall) -> Result<Entity, HubError> {
        let definition = self
            .definitions
            .iter()
            .find(|def| def.matches(&call.service))
            .ok_or_else(|| ServiceError::Unknown {
                service: call.service.clone(),
            })?;
        definition.validate(&call.data)?;

        let entity = self.entity_service.get_entity(call.entity_id).await?;
        if entity.integration != definition.domain {
            return Err(ServiceError::Unsupported {
                service: definition.qualified_name(),
                entity_id: entity.entity_id,
            }
            .into());
        }

        let refreshed = self
            .handler
            .handle_service_call(&entity, definition, call.data.clone())
            .await?;
        let stored = self.entity_service.upsert_entity(refreshed).await?;

        self.publisher
            .publish(Event::new(
                EventType::ServiceCalled,
                Some(stored.id),
                serde_json::json!({
                    "service": definition.qualified_name(),
                    "entity_id": stored.entity_id,
                    "data": call.data,
                }),
            ))
            .await?;
        tracing::info!("service call handled");
        Ok(stored)
    }
}

//! Entity service: use-cases for managing entities.

use std::collections::HashSet;

use shchub_domain::entity::{Entity, EntityState};
use shchub_domain::error::{HubError, NotFoundError};
use shchub_domain::event::{Event, EventType};
use shchub_domain::id::EntityId;
use shchub_domain::time::now;

use crate::ports::{EntityRepository, EventPublisher};

/// Application service for entity registration and state management.
///
/// Every creation and state change is announced on the event bus.
pub struct EntityService<R, EP> {
    repo: R,
    publisher: EP,
}

impl<R: EntityRepository, EP: EventPublisher> EntityService<R, EP> {
    /// Create a new service backed by the given repository and publisher.
    pub fn new(repo: R, publisher: EP) -> Self {
        Self { repo, publisher }
    }

    /// Create a new entity after validating domain invariants.
    ///
    /// An `entity_id` already held by another entity gets the first free
    /// `_2`, `_3`, ... suffix.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, entity), fields(entity_id = %entity.entity_id))]
    pub async fn create_entity(&self, mut entity: Entity) -> Result<Entity, HubError> {
        entity.validate()?;
        entity.entity_id = self.free_entity_id(&entity.entity_id).await?;
        let ts = now();
        entity.last_updated = ts;
        entity.last_changed = ts;
        let created = self.repo.create(entity).await?;
        self.publisher
            .publish(Event::new(
                EventType::EntityCreated,
                Some(created.id),
                serde_json::json!({
                    "entity_id": created.entity_id,
                    "state": created.state,
                }),
            ))
            .await?;
        Ok(created)
    }

    /// Look up an entity by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no entity with `id` exists,
    /// or a storage error from the repository.
    pub async fn get_entity(&self, id: EntityId) -> Result<Entity, HubError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Entity",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Look up an entity by the unique id its integration assigned.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn find_by_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> Result<Option<Entity>, HubError> {
        self.repo.find_by_unique_id(integration, unique_id).await
    }

    /// List all entities.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_entities(&self) -> Result<Vec<Entity>, HubError> {
        self.repo.get_all().await
    }

    /// Create or refresh an entity keyed by `(integration, unique_id)`.
    ///
    /// An existing entity keeps its id, `entity_id` and `last_changed`
    /// unless its state moved. A `StateChanged` event is published when the
    /// state differs from the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    pub async fn upsert_entity(&self, entity: Entity) -> Result<Entity, HubError> {
        entity.validate()?;
        let Some(mut existing) = self
            .repo
            .find_by_unique_id(&entity.integration, &entity.unique_id)
            .await?
        else {
            return self.create_entity(entity).await;
        };

        let previous = existing.state.clone();
        existing.device_id = entity.device_id;
        existing.friendly_name = entity.friendly_name;
        existing.platform = entity.platform;
        existing.attributes = entity.attributes;
        existing.device_class = entity.device_class;
        existing.unit_of_measurement = entity.unit_of_measurement;
        existing.state_class = entity.state_class;
        existing.icon = entity.icon;
        existing.entity_category = entity.entity_category;
        existing.update_state(entity.state, now());

        let updated = self.repo.update(existing).await?;
        if updated.state != previous {
            self.publish_state_changed(&updated, &previous).await?;
        }
        Ok(updated)
    }

    /// Update the state of an existing entity.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if the entity does not exist,
    /// or a storage error from the repository.
    pub async fn update_entity_state(
        &self,
        id: EntityId,
        new_state: EntityState,
    ) -> Result<Entity, HubError> {
        let mut entity = self.get_entity(id).await?;
        let previous = entity.state.clone();
        entity.update_state(new_state, now());
        let updated = self.repo.update(entity).await?;
        if updated.state != previous {
            self.publish_state_changed(&updated, &previous).await?;
        }
        Ok(updated)
    }

    /// Re-key the entity registered under `old_unique_id`.
    ///
    /// Returns `false` when there is nothing to migrate, or when an entity
    /// already uses `new_unique_id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn migrate_unique_id(
        &self,
        integration: &str,
        old_unique_id: &str,
        new_unique_id: &str,
    ) -> Result<bool, HubError> {
        if old_unique_id == new_unique_id {
            return Ok(false);
        }
        let Some(mut entity) = self.repo.find_by_unique_id(integration, old_unique_id).await? else {
            return Ok(false);
        };
        if self
            .repo
            .find_by_unique_id(integration, new_unique_id)
            .await?
            .is_some()
        {
            tracing::debug!("target unique id already registered, skipping migration");
            return Ok(false);
        }
        entity.unique_id = new_unique_id.to_string();
        self.repo.update(entity).await?;
        tracing::info!("migrated entity unique id");
        Ok(true)
    }

    /// Delete an entity by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn delete_entity(&self, id: EntityId) -> Result<(), HubError> {
        self.repo.delete(id).await
    }

    async fn free_entity_id(&self, wanted: &str) -> Result<String, HubError> {
        let taken: HashSet<String> = self
            .repo
            .get_all()
            .await?
            .into_iter()
            .map(|entity| entity.entity_id)
            .collect();
        if !taken.contains(wanted) {
            return Ok(wanted.to_string());
        }
        let mut suffix = 2_usize;
        loop {
            let candidate = format!("{wanted}_{suffix}");
            if !taken.contains(&candidate) {
                tracing::debug!(%candidate, "entity id taken, using suffix");
                return Ok(candidate);
            }
            suffix += 1;
        }
    }

    async fn publish_state_changed(
        &self,
        entity: &Entity,
        previous: &EntityState,
    ) -> Result<(), HubError> {
        tracing::debug!(
            entity_id = %entity.entity_id,
            from = %previous,
            to = %entity.state,
            "entity state changed"
        );
        self.publisher
            .publish(Event::new(
                EventType::StateChanged,
                Some(entity.id),
                serde_json::json!({
                    "entity_id": entity.entity_id,
                    "from": previous,
                    "to": entity.state,
                }),
            ))
            .await
    }
}

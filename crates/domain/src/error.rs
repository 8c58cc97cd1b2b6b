//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! via `#[from]` (no `String` catch-all variants).

/// Top-level error shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("service error")]
    Service(#[from] ServiceError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("integration error")]
    Integration(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("entity id must not be empty")]
    EmptyEntityId,

    #[error("unique id must not be empty")]
    EmptyUniqueId,

    #[error("integration must not be empty")]
    EmptyIntegration,

    #[error("entity id {0:?} must be of the form <platform>.<object_id>")]
    MalformedEntityId(String),

    #[error("identifier {0:?} is not a valid UUID")]
    InvalidId(String),

    #[error("service field {field:?} is required")]
    MissingServiceField { field: &'static str },

    #[error("service field {field:?} must be a string")]
    InvalidServiceField { field: &'static str },

    #[error("unknown alarm command {0:?}")]
    UnknownAlarmCommand(String),
}

/// A lookup did not find the requested record.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A service call could not be routed or executed.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service {service} is not registered")]
    Unknown { service: String },

    #[error("service {service} is not supported by entity {entity_id}")]
    Unsupported { service: String, entity_id: String },
}

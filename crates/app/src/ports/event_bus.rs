//! Event bus port: publish/subscribe for domain events.

use std::future::Future;

use shchub_domain::error::HubError;
use shchub_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send;
}

//! Broadcast bus for domain events inside one process.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};

use shchub_domain::error::HubError;
use shchub_domain::event::Event;

use crate::ports::EventPublisher;

/// Queue depth used by the daemon.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`Event`]s to any number of receivers.
///
/// Clones share one channel. Events published while nobody is subscribed
/// are dropped, and a receiver that falls more than the capacity behind
/// loses the oldest ones.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
        tracing::trace!(event_id = %event.id, event_type = ?event.event_type, "publishing event");
        if self.sender.send(event).is_err() {
            tracing::trace!("no subscriber, event dropped");
        }
        async { Ok(()) }
    }
}

/// Wait for the next event accepted by `accept`, skipping the others.
///
/// Lag is tolerated. Returns `None` once every sender is gone.
pub async fn next_matching(
    rx: &mut broadcast::Receiver<Event>,
    mut accept: impl FnMut(&Event) -> bool,
) -> Option<Event> {
    loop {
        match rx.recv().await {
            Ok(event) if accept(&event) => return Some(event),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event receiver lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shchub_domain::event::EventType;
    use shchub_domain::id::EntityId;

    fn state_changed() -> Event {
        Event::new(EventType::StateChanged, Some(EntityId::new()), serde_json::json!({}))
    }

    #[tokio::test]
    async fn should_deliver_to_subscribers_of_every_clone() {
        let bus = InProcessEventBus::default();
        let other = bus.clone();
        let mut rx1 = bus.subscribe();
        let mut rx2 = other.subscribe();

        let event = state_changed();
        let event_id = event.id;
        other.publish(event).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().id, event_id);
        assert_eq!(rx2.recv().await.unwrap().id, event_id);
    }

    #[tokio::test]
    async fn should_accept_publish_without_subscribers() {
        let bus = InProcessEventBus::new(4);
        assert!(bus.publish(state_changed()).await.is_ok());
    }

    #[tokio::test]
    async fn should_only_see_events_published_after_subscribing() {
        let bus = InProcessEventBus::new(4);
        bus.publish(state_changed()).await.unwrap();
        let mut rx = bus.subscribe();

        let later = Event::new(EventType::ServiceCalled, None, serde_json::json!({}));
        let later_id = later.id;
        bus.publish(later).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id, later_id);
    }

    #[tokio::test]
    async fn should_skip_to_the_matching_integration_event() {
        let bus = InProcessEventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(state_changed()).await.unwrap();
        bus.publish(Event::integration(
            "bosch_shc.event",
            serde_json::json!({"event_type": "ALARM", "event_subtype": "PRIMARY_ALARM"}),
        ))
        .await
        .unwrap();

        let event = next_matching(&mut rx, |e| e.is_integration_event("bosch_shc.event"))
            .await
            .unwrap();
        assert_eq!(event.data["event_subtype"], "PRIMARY_ALARM");
    }

    #[tokio::test]
    async fn should_recover_from_lag_while_matching() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..4 {
            bus.publish(state_changed()).await.unwrap();
        }
        bus.publish(Event::new(EventType::ServiceCalled, None, serde_json::json!({})))
            .await
            .unwrap();

        let event = next_matching(&mut rx, |e| e.event_type == EventType::ServiceCalled).await;
        assert!(event.is_some());
    }

    #[tokio::test]
    async fn should_return_none_when_bus_is_gone() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();
        drop(bus);
        assert!(next_matching(&mut rx, |_| true).await.is_none());
    }
}

//! Device event listeners.
//!
//! Controller callbacks run on whatever thread the session uses, so a
//! listener only turns the callback into a [`DeviceTrigger`] and hands it to
//! the runtime through an unbounded channel. The integration's trigger task
//! then refreshes entities or fires [`EVENT_NAME`] on the event bus.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc::UnboundedSender;

use shchub_app::ports::IntegrationContext;
use shchub_domain::error::HubError;
use shchub_domain::event::Event;

use crate::DOMAIN;
use crate::session::{DeviceService, MotionDetector, ShcDevice, SmokeDetectionSystem, SmokeDetector};

/// Name of the integration event fired for device events.
pub const EVENT_NAME: &str = "bosch_shc.event";

/// The device services an event listener can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Motion,
    Alarm,
    SurveillanceAlarm,
}

impl ListenerKind {
    /// Id of the device service the listener subscribes to.
    #[must_use]
    pub const fn service_id(self) -> &'static str {
        match self {
            Self::Motion => "LatestMotion",
            Self::Alarm => "Alarm",
            Self::SurveillanceAlarm => "SurveillanceAlarm",
        }
    }

    /// `event_type` reported in fired events.
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Motion => "MOTION",
            Self::Alarm | Self::SurveillanceAlarm => "ALARM",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_id())
    }
}

/// Callback key used by event listeners of `device_id`.
#[must_use]
pub fn listener_key(device_id: &str) -> String {
    format!("{device_id}_eventlistener")
}

/// An event read from a device when one of its listened services fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub shc_device_id: String,
    pub name: String,
    pub event_type: &'static str,
    pub event_subtype: String,
    /// Raw motion timestamp, only set for motion events.
    pub last_time_triggered: Option<String>,
}

/// Work handed from controller callbacks to the trigger task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTrigger {
    /// The device pushed new state; its entities must be refreshed.
    StateChanged { shc_device_id: String },
    Event(DeviceEvent),
}

/// A subscription on one device service that fires device events.
pub struct EventListener {
    kind: ListenerKind,
    device_name: String,
    key: String,
    service: Arc<dyn DeviceService>,
}

impl EventListener {
    /// Listen for motion on a motion detector.
    #[must_use]
    pub fn motion(
        device: &Arc<dyn MotionDetector>,
        sender: UnboundedSender<DeviceTrigger>,
    ) -> Option<Self> {
        Self::attach(device, ListenerKind::Motion, sender, |device| {
            (String::new(), Some(device.latest_motion()))
        })
    }

    /// Listen for alarm changes on a smoke detector.
    #[must_use]
    pub fn alarm(
        device: &Arc<dyn SmokeDetector>,
        sender: UnboundedSender<DeviceTrigger>,
    ) -> Option<Self> {
        Self::attach(device, ListenerKind::Alarm, sender, |device| {
            (device.alarm_state().name().to_string(), None)
        })
    }

    /// Listen for alarm changes on the smoke detection system.
    #[must_use]
    pub fn surveillance_alarm(
        device: &Arc<dyn SmokeDetectionSystem>,
        sender: UnboundedSender<DeviceTrigger>,
    ) -> Option<Self> {
        Self::attach(device, ListenerKind::SurveillanceAlarm, sender, |device| {
            (device.surveillance_alarm().name().to_string(), None)
        })
    }

    /// Subscribe to `kind`'s service on `device`.
    ///
    /// `describe` reads the event subtype and the optional trigger time.
    /// Returns `None` when the device does not expose the service.
    fn attach<D, F>(
        device: &Arc<D>,
        kind: ListenerKind,
        sender: UnboundedSender<DeviceTrigger>,
        describe: F,
    ) -> Option<Self>
    where
        D: ShcDevice + ?Sized + 'static,
        F: Fn(&D) -> (String, Option<String>) + Send + Sync + 'static,
    {
        let Some(service) = device.device_service(kind.service_id()) else {
            tracing::debug!(
                device = %device.name(),
                service = kind.service_id(),
                "device does not expose the listened service"
            );
            return None;
        };
        let key = listener_key(device.id());
        let weak: Weak<D> = Arc::downgrade(device);
        service.subscribe_callback(
            &key,
            Arc::new(move || {
                let Some(device) = weak.upgrade() else {
                    return;
                };
                let (event_subtype, last_time_triggered) = describe(&*device);
                let trigger = DeviceTrigger::Event(DeviceEvent {
                    shc_device_id: device.id().to_string(),
                    name: device.name(),
                    event_type: kind.event_type(),
                    event_subtype,
                    last_time_triggered,
                });
                if sender.send(trigger).is_err() {
                    tracing::trace!(device = %device.id(), "trigger task gone, dropping event");
                }
            }),
        );
        Some(Self {
            kind,
            device_name: device.name(),
            key,
            service,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn detach(&self) {
        tracing::debug!(
            "stopping {} event listener for {}",
            self.kind,
            self.device_name
        );
        self.service.unsubscribe_callback(&self.key);
    }
}

/// Publish `event` as a [`EVENT_NAME`] integration event.
///
/// The event carries the id of the host device registered for the
/// controller device. Events of unregistered devices are dropped.
///
/// # Errors
///
/// Returns an error when the registry lookup or the publication fails.
pub async fn fire_event(ctx: &impl IntegrationContext, event: &DeviceEvent) -> Result<(), HubError> {
    let Some(device) = ctx.find_device(DOMAIN, &event.shc_device_id).await? else {
        tracing::warn!(
            shc_device_id = %event.shc_device_id,
            "no device registered for event, dropping"
        );
        return Ok(());
    };
    let mut data = serde_json::json!({
        "device_id": device.id,
        "id": event.shc_device_id,
        "name": event.name,
        "event_type": event.event_type,
        "event_subtype": event.event_subtype,
    });
    if let Some(last_time_triggered) = &event.last_time_triggered {
        data["lastTimeTriggered"] = serde_json::Value::from(last_time_triggered.as_str());
    }
    tracing::debug!(
        device = %event.name,
        event_type = event.event_type,
        event_subtype = %event.event_subtype,
        "firing device event"
    );
    ctx.publish(Event::integration(EVENT_NAME, data)).await
}

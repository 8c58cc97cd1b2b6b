//! # shchub-adapter-bosch-shc
//!
//! Bosch Smart Home Controller integration. Exposes the controller's
//! devices as binary sensor and sensor entities, forwards device events
//! and runs the smoke detector services.
//!
//! ## How it works
//!
//! A [`ShcSession`](session::ShcSession) gives typed access to the
//! controller's devices. On setup every device is registered as a host
//! device attached to the controller, and one entity is built per
//! capability. Devices push state changes through callbacks that may run
//! on any thread; callbacks only enqueue a [`DeviceTrigger`] and a
//! background task refreshes the affected entities or fires
//! [`EVENT_NAME`](listener::EVENT_NAME) events.
//!
//! Motion detectors have no push for "motion ended", so their entities are
//! polled every `scan_interval_secs`.
//!
//! ## Dependency rule
//!
//! Depends on `shchub-app` and `shchub-domain` only.

pub mod binary_sensor;
pub mod config;
pub mod entity;
pub mod error;
pub mod information;
pub mod listener;
pub mod sensor;
pub mod services;
pub mod session;

pub use config::BoschShcConfig;
pub use error::ShcError;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use shchub_app::ports::{Integration, IntegrationContext};
use shchub_domain::entity::Entity;
use shchub_domain::error::HubError;
use shchub_domain::id::DeviceId;
use shchub_domain::service::ServiceDefinition;
use shchub_domain::time::{Clock, SystemClock};

use crate::binary_sensor::{SmokeDetectionSystemSensor, SmokeDetectorSensor};
use crate::entity::{ShcEntity, hub_device, shc_device};
use crate::information::resolve_identity;
use crate::listener::{DeviceTrigger, EventListener};
use crate::services::ShcServiceHandler;
use crate::session::{ShcDevice, ShcSession};

/// Integration name, used as the `integration` of every device and entity.
pub const DOMAIN: &str = "bosch_shc";

/// Callback key of the state push subscription on every device.
const STATE_CALLBACK_KEY: &str = "shchub_state";

/// An entity together with the host device it is attached to.
struct RegisteredEntity {
    entity: Box<dyn ShcEntity>,
    device_id: DeviceId,
}

impl RegisteredEntity {
    fn snapshot(&self) -> Result<Entity, HubError> {
        self.entity.snapshot(self.device_id)
    }
}

/// Bosch Smart Home Controller integration over a [`ShcSession`].
pub struct BoschShcIntegration<S> {
    config: BoschShcConfig,
    session: Arc<S>,
    clock: Arc<dyn Clock>,
    entities: Arc<Vec<RegisteredEntity>>,
    subscriptions: Vec<Arc<dyn ShcDevice>>,
    listeners: Vec<EventListener>,
    trigger_tx: UnboundedSender<DeviceTrigger>,
    trigger_rx: Option<UnboundedReceiver<DeviceTrigger>>,
    tasks: Vec<JoinHandle<()>>,
    handler: ShcServiceHandler,
}

impl<S: ShcSession> BoschShcIntegration<S> {
    /// Create the integration for an established session.
    #[must_use]
    pub fn new(config: BoschShcConfig, session: S) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        Self {
            config,
            session: Arc::new(session),
            clock: Arc::new(SystemClock),
            entities: Arc::new(Vec::new()),
            subscriptions: Vec::new(),
            listeners: Vec::new(),
            trigger_tx,
            trigger_rx: Some(trigger_rx),
            tasks: Vec::new(),
            handler: ShcServiceHandler::default(),
        }
    }

    /// Read time-dependent states (motion) from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Number of entities registered during setup.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn subscribe_state(&mut self, device: Arc<dyn ShcDevice>) {
        let shc_device_id = device.id().to_string();
        let sender = self.trigger_tx.clone();
        device.subscribe_callback(
            STATE_CALLBACK_KEY,
            Arc::new(move || {
                let trigger = DeviceTrigger::StateChanged {
                    shc_device_id: shc_device_id.clone(),
                };
                if sender.send(trigger).is_err() {
                    tracing::trace!(%shc_device_id, "trigger task gone, dropping state push");
                }
            }),
        );
        self.subscriptions.push(device);
    }

    fn attach_listeners(&mut self) {
        let helper = self.session.device_helper();
        let tx = &self.trigger_tx;
        let listeners = helper
            .motion_detectors
            .iter()
            .filter_map(|device| EventListener::motion(device, tx.clone()))
            .chain(
                helper
                    .smoke_detectors
                    .iter()
                    .filter_map(|device| EventListener::alarm(device, tx.clone())),
            )
            .chain(
                helper
                    .smoke_detection_system
                    .iter()
                    .filter_map(|device| EventListener::surveillance_alarm(device, tx.clone())),
            );
        self.listeners.extend(listeners);
    }
}

/// Re-read the entities accepted by `filter` and persist their snapshots.
///
/// A failing entity is logged and skipped so the others still refresh.
async fn refresh(
    ctx: &impl IntegrationContext,
    entities: &[RegisteredEntity],
    filter: impl Fn(&RegisteredEntity) -> bool,
) {
    for registered in entities.iter().filter(|registered| filter(registered)) {
        let result = match registered.snapshot() {
            Ok(snapshot) => ctx.upsert_entity(snapshot).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            tracing::warn!(
                entity = %registered.entity.name(),
                error = %err,
                "failed to refresh entity"
            );
        }
    }
}

async fn handle_trigger(
    ctx: &impl IntegrationContext,
    entities: &[RegisteredEntity],
    trigger: &DeviceTrigger,
) -> Result<(), HubError> {
    match trigger {
        DeviceTrigger::StateChanged { shc_device_id } => {
            refresh(ctx, entities, |registered| {
                registered.entity.device().id() == shc_device_id.as_str()
            })
            .await;
            Ok(())
        }
        DeviceTrigger::Event(event) => listener::fire_event(ctx, event).await,
    }
}

impl<S: ShcSession> Integration for BoschShcIntegration<S> {
    type Handler = ShcServiceHandler;

    fn name(&self) -> &'static str {
        DOMAIN
    }

    fn services(&self) -> Vec<ServiceDefinition> {
        services::definitions()
    }

    fn service_handler(&self) -> Self::Handler {
        self.handler.clone()
    }

    async fn setup(&mut self, ctx: &impl IntegrationContext) -> Result<(), HubError> {
        let session = Arc::clone(&self.session);
        let info = tokio::task::spawn_blocking(move || session.information())
            .await
            .map_err(ShcError::from)
            .and_then(|result| result)
            .map_err(ShcError::into_domain)?;
        let identity = resolve_identity(&info, &self.session.service_records())
            .map_err(ShcError::into_domain)?;

        ctx.upsert_device(hub_device(&identity)?).await?;
        tracing::info!(
            controller = %identity.name,
            version = info.version(),
            update_state = ?info.update_state(),
            "connected to controller"
        );

        let helper = self.session.device_helper().clone();
        if let Some(system) = &helper.smoke_detection_system {
            let sensor = SmokeDetectionSystemSensor::new(system.clone());
            ctx.migrate_unique_id(DOMAIN, &sensor.legacy_unique_id(), &sensor.unique_id())
                .await?;
        }

        let mut device_ids: HashMap<String, DeviceId> = HashMap::new();
        for device in helper.all_devices() {
            let record = match shc_device(&*device, &identity.unique_id) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(shc_device_id = %device.id(), error = %err, "skipping device");
                    continue;
                }
            };
            let registered = ctx.upsert_device(record).await?;
            device_ids.insert(device.id().to_string(), registered.id);
            self.subscribe_state(device);
        }

        let mut entities = binary_sensor::entities(&helper, &self.clock);
        entities.extend(sensor::entities(&helper));
        let mut registered = Vec::with_capacity(entities.len());
        for entity in entities {
            let Some(&device_id) = device_ids.get(entity.device().id()) else {
                tracing::warn!(entity = %entity.name(), "entity without registered device, skipping");
                continue;
            };
            let entry = RegisteredEntity { entity, device_id };
            let snapshot = match entry.snapshot() {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(entity = %entry.entity.name(), error = %err, "skipping entity");
                    continue;
                }
            };
            ctx.upsert_entity(snapshot).await?;
            registered.push(entry);
        }
        tracing::info!(
            devices = device_ids.len(),
            entities = registered.len(),
            "registered controller devices"
        );
        self.entities = Arc::new(registered);

        for detector in &helper.smoke_detectors {
            let unique_id = SmokeDetectorSensor::new(detector.clone()).unique_id();
            self.handler.register(unique_id, detector.clone());
        }
        self.attach_listeners();
        Ok(())
    }

    async fn start_background(
        &mut self,
        ctx: impl IntegrationContext + Clone + 'static,
    ) -> Result<(), HubError> {
        let Some(mut rx) = self.trigger_rx.take() else {
            tracing::warn!("background tasks already started");
            return Ok(());
        };

        let trigger_ctx = ctx.clone();
        let entities = Arc::clone(&self.entities);
        self.tasks.push(tokio::spawn(async move {
            while let Some(trigger) = rx.recv().await {
                if let Err(err) = handle_trigger(&trigger_ctx, &entities, &trigger).await {
                    tracing::warn!(error = %err, ?trigger, "failed to handle device trigger");
                }
            }
        }));

        let period = Duration::from_secs(u64::from(self.config.scan_interval_secs));
        let entities = Arc::clone(&self.entities);
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately and setup just refreshed everything
            interval.tick().await;
            loop {
                interval.tick().await;
                refresh(&ctx, &entities, |r| r.entity.should_poll()).await;
            }
        }));

        tracing::info!(
            scan_interval_secs = self.config.scan_interval_secs,
            "Bosch SHC background tasks started"
        );
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), HubError> {
        for listener in self.listeners.drain(..) {
            listener.detach();
        }
        for device in self.subscriptions.drain(..) {
            device.unsubscribe_callback(STATE_CALLBACK_KEY);
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.handler.clear();
        tracing::info!("Bosch SHC integration stopped");
        Ok(())
    }
}

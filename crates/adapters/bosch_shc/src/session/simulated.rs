//! In-process simulated controller.
//!
//! Devices are described in configuration and keep their state in memory.
//! Mutating a device fires the callbacks registered on it and on the affected
//! service, the same way the real session does when the controller pushes an
//! update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use shchub_domain::time::Timestamp;

use crate::error::ShcError;
use crate::information::{PublicInformation, ServiceRecord, SoftwareUpdateState};

use super::states::{
    AlarmCommand, BatteryLevel, CommunicationQualityState, LeakageState, Rating, ShutterContactState,
    SignalState, SmokeAlarmState, SmokeDetectorCheckState, SurveillanceAlarmState,
    ValveTappetState,
};
use super::{
    AirQuality, Callback, CommunicationQuality, DeviceHelper, DeviceService, HumidityLevel,
    MotionDetector, PowerMeter, STATUS_AVAILABLE, ShcDevice, ShcSession, ShutterContact,
    SmokeDetectionSystem, SmokeDetector, TemperatureLevel, ValveTappet, WaterLeakageDetector,
};

/// Timestamp layout of `latestMotionDetected`.
pub const MOTION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Model family of a simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedKind {
    ShutterContact,
    MotionDetector,
    SmokeDetector,
    SmokeDetectionSystem,
    WaterLeakageDetector,
    Thermostat,
    WallThermostat,
    Twinguard,
    UniversalSwitch,
    SmartPlug,
    LightSwitch,
    SmartPlugCompact,
}

impl SimulatedKind {
    fn default_model(self) -> &'static str {
        match self {
            Self::ShutterContact => "SWD",
            Self::MotionDetector => "MD",
            Self::SmokeDetector => "SD",
            Self::SmokeDetectionSystem => "SMOKE_DETECTION_SYSTEM",
            Self::WaterLeakageDetector => "WLS",
            Self::Thermostat => "TRV",
            Self::WallThermostat => "THB",
            Self::Twinguard => "TWINGUARD",
            Self::UniversalSwitch => "WRC2",
            Self::SmartPlug => "PSM",
            Self::LightSwitch => "BSM",
            Self::SmartPlugCompact => "PLUG_COMPACT",
        }
    }

    fn service_ids(self) -> &'static [&'static str] {
        match self {
            Self::ShutterContact => &["ShutterContact", "BatteryLevel"],
            Self::MotionDetector => &["LatestMotion", "BatteryLevel"],
            Self::SmokeDetector => &["Alarm", "SmokeDetectorCheck", "BatteryLevel"],
            Self::SmokeDetectionSystem => &["SurveillanceAlarm"],
            Self::WaterLeakageDetector => &["WaterLeakageSensor", "BatteryLevel"],
            Self::Thermostat => &["TemperatureLevel", "ValveTappet", "BatteryLevel"],
            Self::WallThermostat => &["TemperatureLevel", "HumidityLevel", "BatteryLevel"],
            Self::Twinguard => &["AirQualityLevel", "BatteryLevel"],
            Self::UniversalSwitch => &["Keypad", "BatteryLevel"],
            Self::SmartPlug | Self::LightSwitch => &["PowerMeter", "PowerSwitch"],
            Self::SmartPlugCompact => &["PowerMeter", "PowerSwitch", "CommunicationQuality"],
        }
    }
}

/// Mutable state of a simulated device. Fields a model does not use are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulatedState {
    pub shutter: ShutterContactState,
    /// Mounting profile of a shutter contact, e.g. `ENTRANCE_DOOR`.
    pub profile: String,
    pub latest_motion: String,
    pub alarm: SmokeAlarmState,
    pub check: SmokeDetectorCheckState,
    pub surveillance_alarm: SurveillanceAlarmState,
    pub leakage: LeakageState,
    pub push_notification: SignalState,
    pub acoustic_signal: SignalState,
    pub temperature: f64,
    pub humidity: f64,
    pub purity: f64,
    pub combined_rating: Rating,
    pub temperature_rating: Rating,
    pub humidity_rating: Rating,
    pub purity_rating: Rating,
    pub description: String,
    pub power: f64,
    pub energy: f64,
    pub communication_quality: CommunicationQualityState,
    pub valve_position: i64,
    pub valve_state: ValveTappetState,
}

fn default_manufacturer() -> String {
    "BOSCH".to_string()
}

fn default_status() -> String {
    STATUS_AVAILABLE.to_string()
}

/// Configuration of one simulated device.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedDeviceConfig {
    pub kind: SimulatedKind,
    pub id: String,
    pub name: String,
    pub serial: String,
    #[serde(default)]
    pub root_device_id: Option<String>,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    /// Battery level; devices without one do not report a battery.
    #[serde(default)]
    pub battery: Option<BatteryLevel>,
    #[serde(default)]
    pub state: SimulatedState,
}

/// Configuration of a simulated controller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    pub mac_address: Option<String>,
    pub sw_version: String,
    /// mDNS records the simulated network advertises.
    pub mdns: Vec<ServiceRecord>,
    pub devices: Vec<SimulatedDeviceConfig>,
}

/// A device service with its own callback table.
pub struct SimulatedService {
    id: String,
    callbacks: Mutex<HashMap<String, Callback>>,
}

impl SimulatedService {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        lock(&self.callbacks).len()
    }

    fn notify(&self) {
        let callbacks: Vec<Callback> = lock(&self.callbacks).values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl DeviceService for SimulatedService {
    fn id(&self) -> &str {
        &self.id
    }

    fn subscribe_callback(&self, key: &str, callback: Callback) {
        lock(&self.callbacks).insert(key.to_string(), callback);
    }

    fn unsubscribe_callback(&self, key: &str) {
        lock(&self.callbacks).remove(key);
    }
}

struct DeviceState {
    name: String,
    status: String,
    battery: BatteryLevel,
    values: SimulatedState,
}

/// A simulated device implementing every capability trait.
pub struct SimulatedDevice {
    kind: SimulatedKind,
    id: String,
    serial: String,
    root_device_id: String,
    manufacturer: String,
    model: String,
    supports_battery: bool,
    state: Mutex<DeviceState>,
    services: Vec<Arc<SimulatedService>>,
    callbacks: Mutex<HashMap<String, Callback>>,
}

impl SimulatedDevice {
    /// Build a device from its configuration.
    #[must_use]
    pub fn from_config(config: &SimulatedDeviceConfig, controller_id: &str) -> Self {
        let kind = config.kind;
        Self {
            kind,
            id: config.id.clone(),
            serial: config.serial.clone(),
            root_device_id: config
                .root_device_id
                .clone()
                .unwrap_or_else(|| controller_id.to_string()),
            manufacturer: config.manufacturer.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            supports_battery: config.battery.is_some(),
            state: Mutex::new(DeviceState {
                name: config.name.clone(),
                status: config.status.clone(),
                battery: config.battery.unwrap_or(BatteryLevel::NotAvailable),
                values: config.state.clone(),
            }),
            services: kind
                .service_ids()
                .iter()
                .map(|id| Arc::new(SimulatedService::new(id)))
                .collect(),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SimulatedKind {
        self.kind
    }

    /// Number of device-level callbacks currently registered.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        lock(&self.callbacks).len()
    }

    /// The simulated service with the given id.
    #[must_use]
    pub fn service(&self, service_id: &str) -> Option<Arc<SimulatedService>> {
        self.services.iter().find(|s| s.id == service_id).cloned()
    }

    /// Mutate state values and notify the device callbacks and those of
    /// `service_id`.
    pub fn update(&self, service_id: &str, change: impl FnOnce(&mut SimulatedState)) {
        change(&mut lock(&self.state).values);
        self.notify(service_id);
    }

    /// Record a motion at `at`.
    pub fn trigger_motion(&self, at: Timestamp) {
        let raw = at.format(MOTION_TIMESTAMP_FORMAT).to_string();
        self.update("LatestMotion", |values| values.latest_motion = raw);
    }

    pub fn set_surveillance_alarm(&self, alarm: SurveillanceAlarmState) {
        self.update("SurveillanceAlarm", |values| values.surveillance_alarm = alarm);
    }

    pub fn set_battery_level(&self, level: BatteryLevel) {
        lock(&self.state).battery = level;
        self.notify("BatteryLevel");
    }

    pub fn set_status(&self, status: &str) {
        lock(&self.state).status = status.to_string();
        self.notify("");
    }

    fn notify(&self, service_id: &str) {
        if let Some(service) = self.service(service_id) {
            service.notify();
        }
        let callbacks: Vec<Callback> = lock(&self.callbacks).values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }

    fn values(&self) -> SimulatedState {
        lock(&self.state).values.clone()
    }

    fn ensure_available(&self) -> Result<(), ShcError> {
        if lock(&self.state).status == STATUS_AVAILABLE {
            Ok(())
        } else {
            Err(ShcError::Session(format!("device {} is not available", self.id)))
        }
    }
}

impl ShcDevice for SimulatedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> String {
        lock(&self.state).name.clone()
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn root_device_id(&self) -> &str {
        &self.root_device_id
    }

    fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    fn device_model(&self) -> &str {
        &self.model
    }

    fn status(&self) -> String {
        lock(&self.state).status.clone()
    }

    fn device_services(&self) -> Vec<Arc<dyn DeviceService>> {
        self.services
            .iter()
            .map(|service| -> Arc<dyn DeviceService> { service.clone() })
            .collect()
    }

    fn supports_battery_level(&self) -> bool {
        self.supports_battery
    }

    fn battery_level(&self) -> BatteryLevel {
        lock(&self.state).battery
    }

    fn subscribe_callback(&self, key: &str, callback: Callback) {
        lock(&self.callbacks).insert(key.to_string(), callback);
    }

    fn unsubscribe_callback(&self, key: &str) {
        lock(&self.callbacks).remove(key);
    }
}

impl ShutterContact for SimulatedDevice {
    fn state(&self) -> ShutterContactState {
        lock(&self.state).values.shutter
    }

    fn device_class(&self) -> String {
        lock(&self.state).values.profile.clone()
    }
}

impl MotionDetector for SimulatedDevice {
    fn latest_motion(&self) -> String {
        lock(&self.state).values.latest_motion.clone()
    }
}

impl SmokeDetector for SimulatedDevice {
    fn alarm_state(&self) -> SmokeAlarmState {
        lock(&self.state).values.alarm
    }

    fn smoke_detector_check_state(&self) -> SmokeDetectorCheckState {
        lock(&self.state).values.check
    }

    fn request_smoke_test(&self) -> Result<(), ShcError> {
        self.ensure_available()?;
        self.update("SmokeDetectorCheck", |values| {
            values.check = SmokeDetectorCheckState::SmokeTestRequested;
        });
        Ok(())
    }

    fn set_alarm_state(&self, command: AlarmCommand) -> Result<(), ShcError> {
        self.ensure_available()?;
        self.update("Alarm", |values| values.alarm = command.resulting_state());
        Ok(())
    }
}

impl SmokeDetectionSystem for SimulatedDevice {
    fn surveillance_alarm(&self) -> SurveillanceAlarmState {
        lock(&self.state).values.surveillance_alarm
    }
}

impl WaterLeakageDetector for SimulatedDevice {
    fn leakage_state(&self) -> LeakageState {
        lock(&self.state).values.leakage
    }

    fn push_notification_state(&self) -> SignalState {
        lock(&self.state).values.push_notification
    }

    fn acoustic_signal_state(&self) -> SignalState {
        lock(&self.state).values.acoustic_signal
    }
}

impl TemperatureLevel for SimulatedDevice {
    fn temperature(&self) -> f64 {
        lock(&self.state).values.temperature
    }
}

impl HumidityLevel for SimulatedDevice {
    fn humidity(&self) -> f64 {
        lock(&self.state).values.humidity
    }
}

impl ValveTappet for SimulatedDevice {
    fn position(&self) -> i64 {
        lock(&self.state).values.valve_position
    }

    fn valve_state(&self) -> ValveTappetState {
        lock(&self.state).values.valve_state
    }
}

impl AirQuality for SimulatedDevice {
    fn purity(&self) -> f64 {
        lock(&self.state).values.purity
    }

    fn combined_rating(&self) -> Rating {
        lock(&self.state).values.combined_rating
    }

    fn temperature_rating(&self) -> Rating {
        lock(&self.state).values.temperature_rating
    }

    fn humidity_rating(&self) -> Rating {
        lock(&self.state).values.humidity_rating
    }

    fn purity_rating(&self) -> Rating {
        lock(&self.state).values.purity_rating
    }

    fn description(&self) -> String {
        self.values().description
    }
}

impl PowerMeter for SimulatedDevice {
    fn power_consumption(&self) -> f64 {
        lock(&self.state).values.power
    }

    fn energy_consumption(&self) -> f64 {
        lock(&self.state).values.energy
    }
}

impl CommunicationQuality for SimulatedDevice {
    fn communication_quality(&self) -> CommunicationQualityState {
        lock(&self.state).values.communication_quality
    }
}

/// A session over simulated devices.
pub struct SimulatedSession {
    information: PublicInformation,
    records: Vec<ServiceRecord>,
    devices: Vec<Arc<SimulatedDevice>>,
    helper: DeviceHelper,
}

impl SimulatedSession {
    /// Build the session for a controller reachable at `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ShcError::Session`] when the configuration declares more
    /// than one smoke detection system or two devices with the same id.
    pub fn from_config(host: &str, config: &SimulatedConfig) -> Result<Self, ShcError> {
        let information = PublicInformation {
            software_update_state: SoftwareUpdateState {
                sw_installed_version: config.sw_version.clone(),
                ..SoftwareUpdateState::default()
            },
            shc_ip_address: (!host.is_empty()).then(|| host.to_string()),
            mac_address: config.mac_address.clone(),
        };
        let controller_id = config
            .mac_address
            .as_deref()
            .map_or_else(|| "hdm:Controller".to_string(), |mac| format!("hdm:Controller:{mac}"));

        let mut devices: Vec<Arc<SimulatedDevice>> = Vec::with_capacity(config.devices.len());
        let mut helper = DeviceHelper::default();
        for device_config in &config.devices {
            if devices.iter().any(|d| d.id == device_config.id) {
                return Err(ShcError::Session(format!(
                    "duplicate device id {}",
                    device_config.id
                )));
            }
            let device = Arc::new(SimulatedDevice::from_config(device_config, &controller_id));
            match device.kind {
                SimulatedKind::ShutterContact => helper.shutter_contacts.push(device.clone()),
                SimulatedKind::MotionDetector => helper.motion_detectors.push(device.clone()),
                SimulatedKind::SmokeDetector => helper.smoke_detectors.push(device.clone()),
                SimulatedKind::SmokeDetectionSystem => {
                    if helper.smoke_detection_system.is_some() {
                        return Err(ShcError::Session(
                            "only one smoke detection system is supported".to_string(),
                        ));
                    }
                    helper.smoke_detection_system = Some(device.clone());
                }
                SimulatedKind::WaterLeakageDetector => {
                    helper.water_leakage_detectors.push(device.clone());
                }
                SimulatedKind::Thermostat => helper.thermostats.push(device.clone()),
                SimulatedKind::WallThermostat => helper.wallthermostats.push(device.clone()),
                SimulatedKind::Twinguard => helper.twinguards.push(device.clone()),
                SimulatedKind::UniversalSwitch => helper.universal_switches.push(device.clone()),
                SimulatedKind::SmartPlug => helper.smart_plugs.push(device.clone()),
                SimulatedKind::LightSwitch => helper.light_switches.push(device.clone()),
                SimulatedKind::SmartPlugCompact => helper.smart_plugs_compact.push(device.clone()),
            }
            devices.push(device);
        }
        tracing::debug!(devices = devices.len(), "simulated session ready");

        Ok(Self {
            information,
            records: config.mdns.clone(),
            devices,
            helper,
        })
    }

    /// The simulated device with the given controller id.
    #[must_use]
    pub fn device(&self, id: &str) -> Option<Arc<SimulatedDevice>> {
        self.devices.iter().find(|d| d.id == id).cloned()
    }
}

impl ShcSession for SimulatedSession {
    fn information(&self) -> Result<PublicInformation, ShcError> {
        Ok(self.information.clone())
    }

    fn device_helper(&self) -> &DeviceHelper {
        &self.helper
    }

    fn service_records(&self) -> Vec<ServiceRecord> {
        self.records.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> SimulatedConfig {
        toml::from_str(
            r#"
            mac_address = "64-da-a0-01-02-03"
            sw_version = "10.9.1"

            [[devices]]
            kind = "motion_detector"
            id = "hdm:ZigBee:motion"
            name = "Hallway Motion"
            serial = "MD001"
            battery = "OK"

            [[devices]]
            kind = "smoke_detector"
            id = "hdm:ZigBee:smoke"
            name = "Kitchen Smoke"
            serial = "SD001"

            [[devices]]
            kind = "thermostat"
            id = "hdm:ZigBee:trv"
            name = "Office Radiator"
            serial = "TRV001"
            state = { temperature = 21.5, valve_position = 42 }
            "#,
        )
        .unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn should_group_devices_by_kind() {
        let session = SimulatedSession::from_config("192.168.1.10", &config()).unwrap();
        let helper = session.device_helper();
        assert_eq!(helper.motion_detectors.len(), 1);
        assert_eq!(helper.smoke_detectors.len(), 1);
        assert_eq!(helper.thermostats.len(), 1);
        assert_eq!(helper.thermostats[0].temperature(), 21.5);
        assert_eq!(helper.thermostats[0].position(), 42);
        assert_eq!(helper.all_devices().len(), 3);
    }

    #[test]
    fn should_report_public_information() {
        let session = SimulatedSession::from_config("192.168.1.10", &config()).unwrap();
        let info = session.information().unwrap();
        assert_eq!(info.version(), "10.9.1");
        assert_eq!(info.shc_ip_address.as_deref(), Some("192.168.1.10"));
        assert_eq!(info.mac_address.as_deref(), Some("64-da-a0-01-02-03"));
    }

    #[test]
    fn should_default_model_and_root_device() {
        let session = SimulatedSession::from_config("", &config()).unwrap();
        let motion = session.device("hdm:ZigBee:motion").unwrap();
        assert_eq!(motion.device_model(), "MD");
        assert_eq!(motion.root_device_id(), "hdm:Controller:64-da-a0-01-02-03");
        assert!(motion.supports_battery_level());
        let smoke = session.device("hdm:ZigBee:smoke").unwrap();
        assert!(!smoke.supports_battery_level());
    }

    #[test]
    fn should_fire_service_and_device_callbacks_on_motion() {
        let session = SimulatedSession::from_config("", &config()).unwrap();
        let motion = session.device("hdm:ZigBee:motion").unwrap();
        let (service_hits, service_cb) = counter();
        let (device_hits, device_cb) = counter();
        motion
            .device_service("LatestMotion")
            .unwrap()
            .subscribe_callback("listener", service_cb);
        motion.subscribe_callback("entity", device_cb);

        motion.trigger_motion(chrono::Utc::now());

        assert_eq!(service_hits.load(Ordering::SeqCst), 1);
        assert_eq!(device_hits.load(Ordering::SeqCst), 1);
        assert!(motion.latest_motion().ends_with('Z'));
    }

    #[test]
    fn should_not_fire_unsubscribed_callback() {
        let session = SimulatedSession::from_config("", &config()).unwrap();
        let smoke = session.device("hdm:ZigBee:smoke").unwrap();
        let (hits, cb) = counter();
        let alarm = smoke.service("Alarm").unwrap();
        alarm.subscribe_callback("listener", cb);
        alarm.unsubscribe_callback("listener");

        smoke
            .set_alarm_state(AlarmCommand::IntrusionAlarmOnRequested)
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(smoke.alarm_state(), SmokeAlarmState::IntrusionAlarm);
    }

    #[test]
    fn should_reject_commands_when_device_unavailable() {
        let session = SimulatedSession::from_config("", &config()).unwrap();
        let smoke = session.device("hdm:ZigBee:smoke").unwrap();
        smoke.set_status("UNAVAILABLE");

        assert!(matches!(smoke.request_smoke_test(), Err(ShcError::Session(_))));
        assert_eq!(
            smoke.smoke_detector_check_state(),
            SmokeDetectorCheckState::None
        );
    }

    #[test]
    fn should_reject_duplicate_device_ids() {
        let mut config = config();
        let duplicate = config.devices[0].clone();
        config.devices.push(duplicate);
        assert!(matches!(
            SimulatedSession::from_config("", &config),
            Err(ShcError::Session(_))
        ));
    }
}

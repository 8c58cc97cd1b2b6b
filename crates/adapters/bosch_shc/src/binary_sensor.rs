//! Binary sensor entities: shutter contacts, motion, smoke, leakage, battery.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::TimeDelta;

use shchub_domain::entity::{AttributeValue, DeviceClass, EntityCategory, EntityState, Platform};
use shchub_domain::time::{Clock, Timestamp, parse_utc};

use crate::entity::ShcEntity;
use crate::session::states::{
    BatteryLevel, LeakageState, ShutterContactState, SmokeAlarmState, SurveillanceAlarmState,
};
use crate::session::{
    DeviceHelper, MotionDetector, ShcDevice, ShutterContact, SmokeDetectionSystem, SmokeDetector,
    WaterLeakageDetector,
};

/// How long a motion keeps the detector on, in seconds.
pub const MOTION_WINDOW_SECS: i64 = 4 * 60;

/// Layout of `latestMotionDetected`; the fraction is optional.
const LATEST_MOTION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

const ICON_SMOKE_DETECTOR: &str = "mdi:smoke-detector";
const ICON_WATER_ALERT: &str = "mdi:water-alert";

/// Build every binary sensor entity the session's devices support.
#[must_use]
pub fn entities(helper: &DeviceHelper, clock: &Arc<dyn Clock>) -> Vec<Box<dyn ShcEntity>> {
    let mut entities: Vec<Box<dyn ShcEntity>> = Vec::new();

    for device in &helper.shutter_contacts {
        entities.push(Box::new(ShutterContactSensor::new(device.clone())));
    }
    for device in &helper.motion_detectors {
        entities.push(Box::new(MotionDetectionSensor::new(
            device.clone(),
            Arc::clone(clock),
        )));
    }
    for device in &helper.smoke_detectors {
        entities.push(Box::new(SmokeDetectorSensor::new(device.clone())));
    }
    if let Some(device) = &helper.smoke_detection_system {
        entities.push(Box::new(SmokeDetectionSystemSensor::new(device.clone())));
    }
    for device in &helper.water_leakage_detectors {
        entities.push(Box::new(WaterLeakageDetectorSensor::new(device.clone())));
    }
    for device in helper.battery_candidates() {
        if device.supports_battery_level() {
            entities.push(Box::new(BatterySensor::new(device)));
        }
    }

    entities
}

/// Device class of a shutter contact for its mounting profile.
#[must_use]
pub fn shutter_device_class(profile: &str) -> DeviceClass {
    match profile {
        "ENTRANCE_DOOR" | "FRENCH_WINDOW" => DeviceClass::Door,
        _ => DeviceClass::Window,
    }
}

/// Whether a motion reported at `latest_motion` is still recent at `now`.
///
/// Unparseable timestamps, including the empty string of a detector that
/// never fired, count as no motion.
#[must_use]
pub fn is_motion_active(latest_motion: &str, now: Timestamp) -> bool {
    let Some(triggered) = parse_utc(latest_motion, LATEST_MOTION_FORMAT) else {
        return false;
    };
    now - triggered <= TimeDelta::seconds(MOTION_WINDOW_SECS)
}

pub struct ShutterContactSensor {
    device: Arc<dyn ShutterContact>,
}

impl ShutterContactSensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShutterContact>) -> Self {
        Self { device }
    }
}

impl ShcEntity for ShutterContactSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn state(&self) -> EntityState {
        EntityState::from_bool(self.device.state() == ShutterContactState::Open)
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(shutter_device_class(&self.device.device_class()))
    }
}

pub struct MotionDetectionSensor {
    device: Arc<dyn MotionDetector>,
    clock: Arc<dyn Clock>,
}

impl MotionDetectionSensor {
    #[must_use]
    pub fn new(device: Arc<dyn MotionDetector>, clock: Arc<dyn Clock>) -> Self {
        Self { device, clock }
    }
}

impl ShcEntity for MotionDetectionSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn state(&self) -> EntityState {
        EntityState::from_bool(is_motion_active(
            &self.device.latest_motion(),
            self.clock.now(),
        ))
    }

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([(
            "last_motion_detected".to_string(),
            AttributeValue::from(self.device.latest_motion()),
        )])
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Motion)
    }

    fn should_poll(&self) -> bool {
        true
    }
}

pub struct SmokeDetectorSensor {
    device: Arc<dyn SmokeDetector>,
}

impl SmokeDetectorSensor {
    #[must_use]
    pub fn new(device: Arc<dyn SmokeDetector>) -> Self {
        Self { device }
    }
}

impl ShcEntity for SmokeDetectorSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn state(&self) -> EntityState {
        EntityState::from_bool(self.device.alarm_state() != SmokeAlarmState::IdleOff)
    }

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                "smokedetectorcheck_state".to_string(),
                AttributeValue::from(self.device.smoke_detector_check_state().name()),
            ),
            (
                "alarmstate".to_string(),
                AttributeValue::from(self.device.alarm_state().name()),
            ),
        ])
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Smoke)
    }

    fn icon(&self) -> Option<&'static str> {
        Some(ICON_SMOKE_DETECTOR)
    }
}

pub struct WaterLeakageDetectorSensor {
    device: Arc<dyn WaterLeakageDetector>,
}

impl WaterLeakageDetectorSensor {
    #[must_use]
    pub fn new(device: Arc<dyn WaterLeakageDetector>) -> Self {
        Self { device }
    }
}

impl ShcEntity for WaterLeakageDetectorSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn state(&self) -> EntityState {
        EntityState::from_bool(self.device.leakage_state() != LeakageState::NoLeakage)
    }

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                "push_notification_state".to_string(),
                AttributeValue::from(self.device.push_notification_state().name()),
            ),
            (
                "acoustic_signal_state".to_string(),
                AttributeValue::from(self.device.acoustic_signal_state().name()),
            ),
        ])
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Moisture)
    }

    fn icon(&self) -> Option<&'static str> {
        Some(ICON_WATER_ALERT)
    }
}

/// The controller-wide smoke detection system.
///
/// Keyed by `<root device id>_<serial>`; older registrations used the bare
/// serial, see [`SmokeDetectionSystemSensor::legacy_unique_id`].
pub struct SmokeDetectionSystemSensor {
    device: Arc<dyn SmokeDetectionSystem>,
}

impl SmokeDetectionSystemSensor {
    #[must_use]
    pub fn new(device: Arc<dyn SmokeDetectionSystem>) -> Self {
        Self { device }
    }

    /// Unique id used before it was scoped by the root device.
    #[must_use]
    pub fn legacy_unique_id(&self) -> String {
        self.device.serial().to_string()
    }
}

impl ShcEntity for SmokeDetectionSystemSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn unique_id(&self) -> String {
        format!("{}_{}", self.device.root_device_id(), self.device.serial())
    }

    fn state(&self) -> EntityState {
        EntityState::from_bool(self.device.surveillance_alarm() != SurveillanceAlarmState::AlarmOff)
    }

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([(
            "alarm_state".to_string(),
            AttributeValue::from(self.device.surveillance_alarm().name()),
        )])
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Smoke)
    }

    fn icon(&self) -> Option<&'static str> {
        Some(ICON_SMOKE_DETECTOR)
    }
}

/// Low battery indicator of any battery powered device.
pub struct BatterySensor {
    device: Arc<dyn ShcDevice>,
}

impl BatterySensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>) -> Self {
        Self { device }
    }
}

impl ShcEntity for BatterySensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn name(&self) -> String {
        format!("{} Battery", self.device.name())
    }

    fn unique_id(&self) -> String {
        format!("{}_battery", self.device.serial())
    }

    fn state(&self) -> EntityState {
        let level = self.device.battery_level();
        match level {
            BatteryLevel::NotAvailable => {
                tracing::debug!(entity = %self.name(), "battery state is not available");
            }
            BatteryLevel::CriticalLow => {
                tracing::warn!(entity = %self.name(), "battery state is critical low");
            }
            BatteryLevel::LowBattery => {
                tracing::warn!(entity = %self.name(), "battery state is low");
            }
            BatteryLevel::Ok | BatteryLevel::CriticallyLowBattery => {}
        }
        EntityState::from_bool(level != BatteryLevel::Ok)
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Battery)
    }

    fn entity_category(&self) -> Option<EntityCategory> {
        Some(EntityCategory::Diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shchub_domain::id::DeviceId;
    use shchub_domain::time::FixedClock;

    use crate::session::ShcSession;
    use crate::session::simulated::{SimulatedConfig, SimulatedSession};

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn session(devices: &str) -> SimulatedSession {
        let config: SimulatedConfig = toml::from_str(devices).unwrap();
        SimulatedSession::from_config("192.168.1.10", &config).unwrap()
    }

    fn clock(now: Timestamp) -> Arc<dyn Clock> {
        Arc::new(FixedClock(now))
    }

    #[test]
    fn should_detect_motion_within_four_minutes() {
        let now = at(12, 4, 0);
        assert!(is_motion_active("2024-03-01T12:00:00.000Z", now));
        assert!(is_motion_active("2024-03-01T12:03:59.500Z", now));
        assert!(!is_motion_active("2024-03-01T11:59:59.999Z", now));
    }

    #[test]
    fn should_accept_timestamp_without_fraction() {
        assert!(is_motion_active("2024-03-01T12:00:00Z", at(12, 1, 0)));
    }

    #[test]
    fn should_treat_unparseable_motion_as_off() {
        let now = at(12, 0, 0);
        assert!(!is_motion_active("", now));
        assert!(!is_motion_active("yesterday", now));
        assert!(!is_motion_active("2024-03-01 12:00:00", now));
    }

    #[test]
    fn should_map_shutter_profiles_to_device_class() {
        assert_eq!(shutter_device_class("ENTRANCE_DOOR"), DeviceClass::Door);
        assert_eq!(shutter_device_class("FRENCH_WINDOW"), DeviceClass::Door);
        assert_eq!(shutter_device_class("REGULAR_WINDOW"), DeviceClass::Window);
        assert_eq!(shutter_device_class("GENERIC"), DeviceClass::Window);
        assert_eq!(shutter_device_class("GARAGE"), DeviceClass::Window);
    }

    #[test]
    fn should_report_open_shutter_as_on() {
        let session = session(
            r#"
            [[devices]]
            kind = "shutter_contact"
            id = "hdm:HomeMaticIP:door"
            name = "Front Door"
            serial = "SWD001"
            state = { shutter = "OPEN", profile = "ENTRANCE_DOOR" }
            "#,
        );
        let sensor = ShutterContactSensor::new(session.device_helper().shutter_contacts[0].clone());
        assert_eq!(sensor.state(), EntityState::On);
        assert_eq!(sensor.device_class(), Some(DeviceClass::Door));
    }

    #[test]
    fn should_expose_last_motion_and_poll() {
        let session = session(
            r#"
            [[devices]]
            kind = "motion_detector"
            id = "hdm:ZigBee:motion"
            name = "Hallway Motion"
            serial = "MD001"
            state = { latest_motion = "2024-03-01T12:00:00.000Z" }
            "#,
        );
        let sensor = MotionDetectionSensor::new(
            session.device_helper().motion_detectors[0].clone(),
            clock(at(12, 2, 0)),
        );
        assert!(sensor.should_poll());
        assert_eq!(sensor.state(), EntityState::On);
        let entity = sensor.snapshot(DeviceId::new()).unwrap();
        assert_eq!(
            entity.get_attribute("last_motion_detected"),
            Some(&AttributeValue::String("2024-03-01T12:00:00.000Z".to_string()))
        );
        assert_eq!(entity.device_class, Some(DeviceClass::Motion));

        let stale = MotionDetectionSensor::new(
            session.device_helper().motion_detectors[0].clone(),
            clock(at(12, 5, 0)),
        );
        assert_eq!(stale.state(), EntityState::Off);
    }

    #[test]
    fn should_report_smoke_alarm_with_attributes() {
        let session = session(
            r#"
            [[devices]]
            kind = "smoke_detector"
            id = "hdm:ZigBee:smoke"
            name = "Kitchen Smoke"
            serial = "SD001"
            state = { alarm = "PRIMARY_ALARM", check = "SMOKE_TEST_OK" }
            "#,
        );
        let sensor = SmokeDetectorSensor::new(session.device_helper().smoke_detectors[0].clone());
        let entity = sensor.snapshot(DeviceId::new()).unwrap();
        assert_eq!(entity.state, EntityState::On);
        assert_eq!(entity.icon.as_deref(), Some("mdi:smoke-detector"));
        assert_eq!(
            entity.get_attribute("alarmstate").and_then(AttributeValue::as_str),
            Some("PRIMARY_ALARM")
        );
        assert_eq!(
            entity
                .get_attribute("smokedetectorcheck_state")
                .and_then(AttributeValue::as_str),
            Some("SMOKE_TEST_OK")
        );
    }

    #[test]
    fn should_report_idle_smoke_detector_as_off() {
        let session = session(
            r#"
            [[devices]]
            kind = "smoke_detector"
            id = "hdm:ZigBee:smoke"
            name = "Kitchen Smoke"
            serial = "SD001"
            "#,
        );
        let sensor = SmokeDetectorSensor::new(session.device_helper().smoke_detectors[0].clone());
        assert_eq!(sensor.state(), EntityState::Off);
    }

    #[test]
    fn should_report_leakage_with_signal_attributes() {
        let session = session(
            r#"
            [[devices]]
            kind = "water_leakage_detector"
            id = "hdm:ZigBee:leak"
            name = "Bathroom Leak"
            serial = "WLS001"
            state = { leakage = "LEAKAGE_DETECTED", acoustic_signal = "DISABLED" }
            "#,
        );
        let sensor =
            WaterLeakageDetectorSensor::new(session.device_helper().water_leakage_detectors[0].clone());
        let entity = sensor.snapshot(DeviceId::new()).unwrap();
        assert_eq!(entity.state, EntityState::On);
        assert_eq!(entity.device_class, Some(DeviceClass::Moisture));
        assert_eq!(entity.icon.as_deref(), Some("mdi:water-alert"));
        assert_eq!(
            entity
                .get_attribute("acoustic_signal_state")
                .and_then(AttributeValue::as_str),
            Some("DISABLED")
        );
        assert_eq!(
            entity
                .get_attribute("push_notification_state")
                .and_then(AttributeValue::as_str),
            Some("ENABLED")
        );
    }

    #[test]
    fn should_scope_smoke_detection_system_by_root_device() {
        let session = session(
            r#"
            [[devices]]
            kind = "smoke_detection_system"
            id = "smokeDetectionSystem"
            name = "Smoke Detection System"
            serial = "smokeDetectionSystem"
            root_device_id = "64-da-a0-01-02-03"
            state = { surveillance_alarm = "PRE_ALARM" }
            "#,
        );
        let system = session.device_helper().smoke_detection_system.clone().unwrap();
        let sensor = SmokeDetectionSystemSensor::new(system);
        assert_eq!(sensor.unique_id(), "64-da-a0-01-02-03_smokeDetectionSystem");
        assert_eq!(sensor.legacy_unique_id(), "smokeDetectionSystem");
        assert_eq!(sensor.state(), EntityState::On);
        let entity = sensor.snapshot(DeviceId::new()).unwrap();
        assert_eq!(
            entity.get_attribute("alarm_state").and_then(AttributeValue::as_str),
            Some("PRE_ALARM")
        );
    }

    #[test]
    fn should_name_battery_sensor_after_device() {
        let session = session(
            r#"
            [[devices]]
            kind = "thermostat"
            id = "hdm:ZigBee:trv"
            name = "Office Radiator"
            serial = "TRV001"
            battery = "LOW_BATTERY"
            "#,
        );
        let device = session.device("hdm:ZigBee:trv").unwrap();
        let sensor = BatterySensor::new(device.clone());
        let entity = sensor.snapshot(DeviceId::new()).unwrap();
        assert_eq!(entity.friendly_name, "Office Radiator Battery");
        assert_eq!(entity.unique_id, "TRV001_battery");
        assert_eq!(entity.entity_category, Some(EntityCategory::Diagnostic));
        assert_eq!(entity.state, EntityState::On);

        device.set_battery_level(BatteryLevel::Ok);
        assert_eq!(sensor.state(), EntityState::Off);
    }

    #[test]
    fn should_only_create_battery_sensors_for_supported_devices() {
        let session = session(
            r#"
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
            kind = "smart_plug"
            id = "hdm:ZigBee:plug"
            name = "Kitchen Plug"
            serial = "PSM001"
            battery = "OK"
            "#,
        );
        let all = entities(session.device_helper(), &clock(at(12, 0, 0)));
        let batteries: Vec<_> = all
            .iter()
            .filter(|e| e.device_class() == Some(DeviceClass::Battery))
            .map(|e| e.unique_id())
            .collect();
        assert_eq!(batteries, ["MD001_battery"]);
        assert_eq!(all.len(), 3);
    }
}

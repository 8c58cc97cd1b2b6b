//! Session collaborator: the controller's device layer, seen through traits.
//!
//! The session library owns pairing, polling and JSON decoding; this crate only
//! reads typed device state from it, registers change callbacks and forwards a
//! few commands. Callbacks may be invoked from any thread.
//!
//! Capability traits such as temperature or humidity carry no supertrait so a
//! combined device trait such as [`Thermostat`] can be upcast to each of them.

pub mod simulated;
pub mod states;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ShcError;
use crate::information::{PublicInformation, ServiceRecord};

use states::{
    AlarmCommand, BatteryLevel, CommunicationQualityState, LeakageState, Rating, ShutterContactState,
    SignalState, SmokeAlarmState, SmokeDetectorCheckState, SurveillanceAlarmState,
    ValveTappetState,
};

/// Status value of a reachable device.
pub const STATUS_AVAILABLE: &str = "AVAILABLE";

/// Change notification registered on a device or one of its services.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// An open session with a controller.
pub trait ShcSession: Send + Sync + 'static {
    /// Fetch the controller's public information. May block on IO.
    ///
    /// # Errors
    ///
    /// Returns [`ShcError::Connection`] when the controller does not answer.
    fn information(&self) -> Result<PublicInformation, ShcError>;

    /// Typed device collections known to the session.
    fn device_helper(&self) -> &DeviceHelper;

    /// mDNS records seen while browsing `_http._tcp.local.`, if any.
    fn service_records(&self) -> Vec<ServiceRecord> {
        Vec::new()
    }
}

/// One service of a device, e.g. `LatestMotion` or `Alarm`.
pub trait DeviceService: Send + Sync {
    fn id(&self) -> &str;

    /// Register `callback` under `key`, replacing any previous one.
    fn subscribe_callback(&self, key: &str, callback: Callback);

    fn unsubscribe_callback(&self, key: &str);
}

/// Attributes every controller device exposes.
pub trait ShcDevice: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> String;
    fn serial(&self) -> &str;
    fn root_device_id(&self) -> &str;
    fn manufacturer(&self) -> &str;
    fn device_model(&self) -> &str;
    /// Reachability as reported by the controller, `AVAILABLE` when online.
    fn status(&self) -> String;
    fn device_services(&self) -> Vec<Arc<dyn DeviceService>>;
    fn supports_battery_level(&self) -> bool;
    fn battery_level(&self) -> BatteryLevel;

    /// Register a callback fired on any state change of the device.
    fn subscribe_callback(&self, key: &str, callback: Callback);

    fn unsubscribe_callback(&self, key: &str);

    /// The service with the given id, if the device has one.
    fn device_service(&self, service_id: &str) -> Option<Arc<dyn DeviceService>> {
        self.device_services()
            .into_iter()
            .find(|service| service.id() == service_id)
    }
}

pub trait ShutterContact: ShcDevice {
    fn state(&self) -> ShutterContactState;
    /// Mounting profile, e.g. `ENTRANCE_DOOR` or `REGULAR_WINDOW`.
    fn device_class(&self) -> String;
}

pub trait MotionDetector: ShcDevice {
    /// Raw `latestMotionDetected` timestamp, empty when never triggered.
    fn latest_motion(&self) -> String;
}

pub trait SmokeDetector: ShcDevice {
    fn alarm_state(&self) -> SmokeAlarmState;
    fn smoke_detector_check_state(&self) -> SmokeDetectorCheckState;

    /// Ask the detector to run its self-test. Blocks on IO.
    ///
    /// # Errors
    ///
    /// Returns a session error when the controller rejects the request.
    fn request_smoke_test(&self) -> Result<(), ShcError>;

    /// Write the `Alarm` service state. Blocks on IO.
    ///
    /// # Errors
    ///
    /// Returns a session error when the controller rejects the request.
    fn set_alarm_state(&self, command: AlarmCommand) -> Result<(), ShcError>;
}

pub trait SmokeDetectionSystem: ShcDevice {
    fn surveillance_alarm(&self) -> SurveillanceAlarmState;
}

pub trait WaterLeakageDetector: ShcDevice {
    fn leakage_state(&self) -> LeakageState;
    fn push_notification_state(&self) -> SignalState;
    fn acoustic_signal_state(&self) -> SignalState;
}

pub trait TemperatureLevel: Send + Sync {
    fn temperature(&self) -> f64;
}

pub trait HumidityLevel: Send + Sync {
    fn humidity(&self) -> f64;
}

pub trait ValveTappet: Send + Sync {
    /// Valve opening in percent.
    fn position(&self) -> i64;
    fn valve_state(&self) -> ValveTappetState;
}

pub trait AirQuality: Send + Sync {
    fn purity(&self) -> f64;
    fn combined_rating(&self) -> Rating;
    fn temperature_rating(&self) -> Rating;
    fn humidity_rating(&self) -> Rating;
    fn purity_rating(&self) -> Rating;
    fn description(&self) -> String;
}

pub trait PowerMeter: Send + Sync {
    /// Current consumption in W.
    fn power_consumption(&self) -> f64;
    /// Accumulated consumption in Wh.
    fn energy_consumption(&self) -> f64;
}

pub trait CommunicationQuality: Send + Sync {
    fn communication_quality(&self) -> CommunicationQualityState;
}

/// Radiator thermostat.
pub trait Thermostat: ShcDevice + TemperatureLevel + ValveTappet {}
impl<T: ShcDevice + TemperatureLevel + ValveTappet + ?Sized> Thermostat for T {}

/// Wall thermostat / room climate sensor.
pub trait WallThermostat: ShcDevice + TemperatureLevel + HumidityLevel {}
impl<T: ShcDevice + TemperatureLevel + HumidityLevel + ?Sized> WallThermostat for T {}

/// Twinguard air quality and smoke sensor.
pub trait Twinguard: ShcDevice + TemperatureLevel + HumidityLevel + AirQuality {}
impl<T: ShcDevice + TemperatureLevel + HumidityLevel + AirQuality + ?Sized> Twinguard for T {}

/// Smart plug or light switch with a power meter.
pub trait SmartPlug: ShcDevice + PowerMeter {}
impl<T: ShcDevice + PowerMeter + ?Sized> SmartPlug for T {}

/// Compact smart plug, which also reports its radio link quality.
pub trait SmartPlugCompact: ShcDevice + PowerMeter + CommunicationQuality {}
impl<T: ShcDevice + PowerMeter + CommunicationQuality + ?Sized> SmartPlugCompact for T {}

/// Device collections of a session, grouped by model family.
#[derive(Clone, Default)]
pub struct DeviceHelper {
    pub shutter_contacts: Vec<Arc<dyn ShutterContact>>,
    pub motion_detectors: Vec<Arc<dyn MotionDetector>>,
    pub smoke_detectors: Vec<Arc<dyn SmokeDetector>>,
    pub smoke_detection_system: Option<Arc<dyn SmokeDetectionSystem>>,
    pub water_leakage_detectors: Vec<Arc<dyn WaterLeakageDetector>>,
    pub thermostats: Vec<Arc<dyn Thermostat>>,
    pub wallthermostats: Vec<Arc<dyn WallThermostat>>,
    pub twinguards: Vec<Arc<dyn Twinguard>>,
    pub universal_switches: Vec<Arc<dyn ShcDevice>>,
    pub smart_plugs: Vec<Arc<dyn SmartPlug>>,
    pub light_switches: Vec<Arc<dyn SmartPlug>>,
    pub smart_plugs_compact: Vec<Arc<dyn SmartPlugCompact>>,
}

impl DeviceHelper {
    /// Devices that may report a battery level, in registration order.
    #[must_use]
    pub fn battery_candidates(&self) -> Vec<Arc<dyn ShcDevice>> {
        let mut devices: Vec<Arc<dyn ShcDevice>> = Vec::new();
        for device in &self.motion_detectors {
            devices.push(device.clone());
        }
        for device in &self.shutter_contacts {
            devices.push(device.clone());
        }
        for device in &self.smoke_detectors {
            devices.push(device.clone());
        }
        for device in &self.thermostats {
            devices.push(device.clone());
        }
        for device in &self.twinguards {
            devices.push(device.clone());
        }
        devices.extend(self.universal_switches.iter().cloned());
        for device in &self.wallthermostats {
            devices.push(device.clone());
        }
        for device in &self.water_leakage_detectors {
            devices.push(device.clone());
        }
        devices
    }

    /// Every device exactly once.
    #[must_use]
    pub fn all_devices(&self) -> Vec<Arc<dyn ShcDevice>> {
        let mut devices = self.battery_candidates();
        if let Some(system) = &self.smoke_detection_system {
            devices.push(system.clone());
        }
        for device in self.smart_plugs.iter().chain(&self.light_switches) {
            devices.push(device.clone());
        }
        for device in &self.smart_plugs_compact {
            devices.push(device.clone());
        }

        let mut seen = HashSet::new();
        devices.retain(|d| seen.insert(d.id().to_string()));
        devices
    }
}

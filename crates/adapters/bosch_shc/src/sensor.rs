//! Sensor entities: climate, air quality, power metering, valve position.

use std::collections::HashMap;
use std::sync::Arc;

use shchub_domain::entity::{
    AttributeValue, DeviceClass, EntityState, Platform, StateClass, UNIT_CELSIUS,
    UNIT_KILO_WATT_HOUR, UNIT_PARTS_PER_MILLION, UNIT_PERCENTAGE, UNIT_WATT,
};

use crate::entity::ShcEntity;
use crate::session::states::Rating;
use crate::session::{
    AirQuality, CommunicationQuality, DeviceHelper, HumidityLevel, PowerMeter, ShcDevice,
    TemperatureLevel, ValveTappet,
};

/// Build every sensor entity the session's devices support.
#[must_use]
pub fn entities(helper: &DeviceHelper) -> Vec<Box<dyn ShcEntity>> {
    let mut entities: Vec<Box<dyn ShcEntity>> = Vec::new();

    for device in &helper.thermostats {
        entities.push(Box::new(TemperatureSensor::new(device.clone(), device.clone())));
        entities.push(Box::new(ValveTappetSensor::new(device.clone(), device.clone())));
    }
    for device in &helper.wallthermostats {
        entities.push(Box::new(TemperatureSensor::new(device.clone(), device.clone())));
        entities.push(Box::new(HumiditySensor::new(device.clone(), device.clone())));
    }
    for device in &helper.twinguards {
        entities.push(Box::new(TemperatureSensor::new(device.clone(), device.clone())));
        entities.push(Box::new(HumiditySensor::new(device.clone(), device.clone())));
        entities.push(Box::new(PuritySensor::new(device.clone(), device.clone())));
        entities.push(Box::new(AirQualitySensor::new(device.clone(), device.clone())));
        for kind in [RatingKind::Temperature, RatingKind::Humidity, RatingKind::Purity] {
            entities.push(Box::new(RatingSensor::new(device.clone(), device.clone(), kind)));
        }
    }
    for device in helper.smart_plugs.iter().chain(&helper.light_switches) {
        entities.push(Box::new(PowerSensor::new(device.clone(), device.clone())));
        entities.push(Box::new(EnergySensor::new(device.clone(), device.clone())));
    }
    for device in &helper.smart_plugs_compact {
        entities.push(Box::new(PowerSensor::new(device.clone(), device.clone())));
        entities.push(Box::new(EnergySensor::new(device.clone(), device.clone())));
        entities.push(Box::new(CommunicationQualitySensor::new(
            device.clone(),
            device.clone(),
        )));
    }

    entities
}

fn suffixed(device: &dyn ShcDevice, name: &str, key: &str) -> (String, String) {
    (
        format!("{} {name}", device.name()),
        format!("{}_{key}", device.serial()),
    )
}

pub struct TemperatureSensor {
    device: Arc<dyn ShcDevice>,
    level: Arc<dyn TemperatureLevel>,
}

impl TemperatureSensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, level: Arc<dyn TemperatureLevel>) -> Self {
        Self { device, level }
    }
}

impl ShcEntity for TemperatureSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Temperature", "temperature").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Temperature", "temperature").1
    }

    fn state(&self) -> EntityState {
        EntityState::Numeric(self.level.temperature())
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Temperature)
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(UNIT_CELSIUS)
    }

    fn state_class(&self) -> Option<StateClass> {
        Some(StateClass::Measurement)
    }
}

pub struct HumiditySensor {
    device: Arc<dyn ShcDevice>,
    level: Arc<dyn HumidityLevel>,
}

impl HumiditySensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, level: Arc<dyn HumidityLevel>) -> Self {
        Self { device, level }
    }
}

impl ShcEntity for HumiditySensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Humidity", "humidity").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Humidity", "humidity").1
    }

    fn state(&self) -> EntityState {
        EntityState::Numeric(self.level.humidity())
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Humidity)
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(UNIT_PERCENTAGE)
    }

    fn state_class(&self) -> Option<StateClass> {
        Some(StateClass::Measurement)
    }
}

pub struct PuritySensor {
    device: Arc<dyn ShcDevice>,
    air: Arc<dyn AirQuality>,
}

impl PuritySensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, air: Arc<dyn AirQuality>) -> Self {
        Self { device, air }
    }
}

impl ShcEntity for PuritySensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Purity", "purity").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Purity", "purity").1
    }

    fn state(&self) -> EntityState {
        EntityState::Numeric(self.air.purity())
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(UNIT_PARTS_PER_MILLION)
    }

    fn state_class(&self) -> Option<StateClass> {
        Some(StateClass::Measurement)
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:molecule-co2")
    }
}

/// Combined air quality rating of a twinguard.
pub struct AirQualitySensor {
    device: Arc<dyn ShcDevice>,
    air: Arc<dyn AirQuality>,
}

impl AirQualitySensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, air: Arc<dyn AirQuality>) -> Self {
        Self { device, air }
    }
}

impl ShcEntity for AirQualitySensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Air Quality", "airquality").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Air Quality", "airquality").1
    }

    fn state(&self) -> EntityState {
        EntityState::Text(self.air.combined_rating().name().to_string())
    }

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([(
            "rating_description".to_string(),
            AttributeValue::from(self.air.description()),
        )])
    }
}

/// Which of the single-aspect twinguard ratings a [`RatingSensor`] shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingKind {
    Temperature,
    Humidity,
    Purity,
}

impl RatingKind {
    fn label(self) -> (&'static str, &'static str) {
        match self {
            Self::Temperature => ("Temperature Rating", "temperature_rating"),
            Self::Humidity => ("Humidity Rating", "humidity_rating"),
            Self::Purity => ("Purity Rating", "purity_rating"),
        }
    }

    fn read(self, air: &dyn AirQuality) -> Rating {
        match self {
            Self::Temperature => air.temperature_rating(),
            Self::Humidity => air.humidity_rating(),
            Self::Purity => air.purity_rating(),
        }
    }
}

pub struct RatingSensor {
    device: Arc<dyn ShcDevice>,
    air: Arc<dyn AirQuality>,
    kind: RatingKind,
}

impl RatingSensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, air: Arc<dyn AirQuality>, kind: RatingKind) -> Self {
        Self { device, air, kind }
    }
}

impl ShcEntity for RatingSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        let (name, key) = self.kind.label();
        suffixed(self.device(), name, key).0
    }

    fn unique_id(&self) -> String {
        let (name, key) = self.kind.label();
        suffixed(self.device(), name, key).1
    }

    fn state(&self) -> EntityState {
        EntityState::Text(self.kind.read(&*self.air).name().to_string())
    }
}

pub struct PowerSensor {
    device: Arc<dyn ShcDevice>,
    meter: Arc<dyn PowerMeter>,
}

impl PowerSensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, meter: Arc<dyn PowerMeter>) -> Self {
        Self { device, meter }
    }
}

impl ShcEntity for PowerSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Power", "power").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Power", "power").1
    }

    fn state(&self) -> EntityState {
        EntityState::Numeric(self.meter.power_consumption())
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Power)
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(UNIT_WATT)
    }

    fn state_class(&self) -> Option<StateClass> {
        Some(StateClass::Measurement)
    }
}

/// Accumulated consumption, converted from Wh to kWh.
pub struct EnergySensor {
    device: Arc<dyn ShcDevice>,
    meter: Arc<dyn PowerMeter>,
}

impl EnergySensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, meter: Arc<dyn PowerMeter>) -> Self {
        Self { device, meter }
    }
}

impl ShcEntity for EnergySensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Energy", "energy").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Energy", "energy").1
    }

    fn state(&self) -> EntityState {
        EntityState::Numeric(self.meter.energy_consumption() / 1000.0)
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(DeviceClass::Energy)
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(UNIT_KILO_WATT_HOUR)
    }

    fn state_class(&self) -> Option<StateClass> {
        Some(StateClass::TotalIncreasing)
    }
}

pub struct CommunicationQualitySensor {
    device: Arc<dyn ShcDevice>,
    link: Arc<dyn CommunicationQuality>,
}

impl CommunicationQualitySensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, link: Arc<dyn CommunicationQuality>) -> Self {
        Self { device, link }
    }
}

impl ShcEntity for CommunicationQualitySensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Communication Quality", "communication_quality").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Communication Quality", "communication_quality").1
    }

    fn state(&self) -> EntityState {
        EntityState::Text(self.link.communication_quality().name().to_string())
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:wifi")
    }
}

/// Valve opening of a radiator thermostat.
pub struct ValveTappetSensor {
    device: Arc<dyn ShcDevice>,
    valve: Arc<dyn ValveTappet>,
}

impl ValveTappetSensor {
    #[must_use]
    pub fn new(device: Arc<dyn ShcDevice>, valve: Arc<dyn ValveTappet>) -> Self {
        Self { device, valve }
    }
}

impl ShcEntity for ValveTappetSensor {
    fn device(&self) -> &dyn ShcDevice {
        &*self.device
    }

    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        suffixed(self.device(), "Valvetappet", "valvetappet").0
    }

    fn unique_id(&self) -> String {
        suffixed(self.device(), "Valvetappet", "valvetappet").1
    }

    #[allow(clippy::cast_precision_loss)]
    fn state(&self) -> EntityState {
        EntityState::Numeric(self.valve.position() as f64)
    }

    fn attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([(
            "valve_tappet_state".to_string(),
            AttributeValue::from(self.valve.valve_state().name()),
        )])
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(UNIT_PERCENTAGE)
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:gauge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shchub_domain::id::DeviceId;

    use crate::session::ShcSession;
    use crate::session::simulated::{SimulatedConfig, SimulatedSession};

    fn session() -> SimulatedSession {
        let config: SimulatedConfig = toml::from_str(
            r#"
            [[devices]]
            kind = "thermostat"
            id = "hdm:ZigBee:trv"
            name = "Office Radiator"
            serial = "TRV001"
            state = { temperature = 21.5, valve_position = 42, valve_state = "VALVE_ADAPTION_SUCCESSFUL" }

            [[devices]]
            kind = "wall_thermostat"
            id = "hdm:ZigBee:thb"
            name = "Bedroom Climate"
            serial = "THB001"
            state = { temperature = 19.0, humidity = 55.0 }

            [[devices]]
            kind = "twinguard"
            id = "hdm:ZigBee:twinguard"
            name = "Living Twinguard"
            serial = "TG001"

            [devices.state]
            temperature = 22.0
            humidity = 40.0
            purity = 650.0
            combined_rating = "MEDIUM"
            temperature_rating = "GOOD"
            humidity_rating = "BAD"
            purity_rating = "MEDIUM"
            description = "Humidity too low"

            [[devices]]
            kind = "smart_plug"
            id = "hdm:ZigBee:plug"
            name = "Kitchen Plug"
            serial = "PSM001"
            state = { power = 120.5, energy = 2500.0 }

            [[devices]]
            kind = "smart_plug_compact"
            id = "hdm:ZigBee:compact"
            name = "Desk Plug"
            serial = "PC001"
            state = { communication_quality = "GOOD" }
            "#,
        )
        .unwrap();
        SimulatedSession::from_config("192.168.1.10", &config).unwrap()
    }

    fn find<'a>(entities: &'a [Box<dyn ShcEntity>], unique_id: &str) -> &'a dyn ShcEntity {
        entities
            .iter()
            .find(|e| e.unique_id() == unique_id)
            .map(|entity| &**entity)
            .unwrap()
    }

    #[test]
    fn should_create_sensors_per_device_family() {
        let session = session();
        let all = entities(session.device_helper());
        // thermostat 2, wall thermostat 2, twinguard 7, plug 2, compact 3
        assert_eq!(all.len(), 16);
    }

    #[test]
    fn should_report_temperature_in_celsius() {
        let session = session();
        let all = entities(session.device_helper());
        let entity = find(&all, "TRV001_temperature")
            .snapshot(DeviceId::new())
            .unwrap();
        assert_eq!(entity.friendly_name, "Office Radiator Temperature");
        assert_eq!(entity.entity_id, "sensor.office_radiator_temperature");
        assert_eq!(entity.state, EntityState::Numeric(21.5));
        assert_eq!(entity.unit_of_measurement.as_deref(), Some("°C"));
        assert_eq!(entity.state_class, Some(StateClass::Measurement));
        assert_eq!(entity.device_class, Some(DeviceClass::Temperature));
    }

    #[test]
    fn should_report_valve_position_with_state_attribute() {
        let session = session();
        let all = entities(session.device_helper());
        let entity = find(&all, "TRV001_valvetappet")
            .snapshot(DeviceId::new())
            .unwrap();
        assert_eq!(entity.friendly_name, "Office Radiator Valvetappet");
        assert_eq!(entity.state, EntityState::Numeric(42.0));
        assert_eq!(entity.icon.as_deref(), Some("mdi:gauge"));
        assert_eq!(entity.state_class, None);
        assert_eq!(
            entity
                .get_attribute("valve_tappet_state")
                .and_then(AttributeValue::as_str),
            Some("VALVE_ADAPTION_SUCCESSFUL")
        );
    }

    #[test]
    fn should_report_twinguard_air_quality() {
        let session = session();
        let all = entities(session.device_helper());

        let air = find(&all, "TG001_airquality").snapshot(DeviceId::new()).unwrap();
        assert_eq!(air.friendly_name, "Living Twinguard Air Quality");
        assert_eq!(air.state, EntityState::Text("MEDIUM".to_string()));
        assert_eq!(
            air.get_attribute("rating_description").and_then(AttributeValue::as_str),
            Some("Humidity too low")
        );

        let purity = find(&all, "TG001_purity").snapshot(DeviceId::new()).unwrap();
        assert_eq!(purity.unit_of_measurement.as_deref(), Some("ppm"));
        assert_eq!(purity.icon.as_deref(), Some("mdi:molecule-co2"));

        let humidity_rating = find(&all, "TG001_humidity_rating");
        assert_eq!(humidity_rating.name(), "Living Twinguard Humidity Rating");
        assert_eq!(humidity_rating.state(), EntityState::Text("BAD".to_string()));
    }

    #[test]
    fn should_convert_energy_to_kilowatt_hours() {
        let session = session();
        let all = entities(session.device_helper());

        let energy = find(&all, "PSM001_energy").snapshot(DeviceId::new()).unwrap();
        assert_eq!(energy.state, EntityState::Numeric(2.5));
        assert_eq!(energy.unit_of_measurement.as_deref(), Some("kWh"));
        assert_eq!(energy.state_class, Some(StateClass::TotalIncreasing));

        let power = find(&all, "PSM001_power").snapshot(DeviceId::new()).unwrap();
        assert_eq!(power.state, EntityState::Numeric(120.5));
        assert_eq!(power.unit_of_measurement.as_deref(), Some("W"));
    }

    #[test]
    fn should_report_communication_quality_of_compact_plugs() {
        let session = session();
        let all = entities(session.device_helper());
        let quality = find(&all, "PC001_communication_quality");
        assert_eq!(quality.name(), "Desk Plug Communication Quality");
        assert_eq!(quality.state(), EntityState::Text("GOOD".to_string()));
        assert_eq!(quality.icon(), Some("mdi:wifi"));
    }
}

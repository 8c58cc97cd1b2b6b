//! Presentation metadata for entities: platform, device class, state class,
//! category and units of measurement.

use serde::{Deserialize, Serialize};

pub const UNIT_CELSIUS: &str = "\u{b0}C";
pub const UNIT_PERCENTAGE: &str = "%";
pub const UNIT_PARTS_PER_MILLION: &str = "ppm";
pub const UNIT_WATT: &str = "W";
pub const UNIT_KILO_WATT_HOUR: &str = "kWh";

/// The kind of entity, which also prefixes its `entity_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    BinarySensor,
    Sensor,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BinarySensor => "binary_sensor",
            Self::Sensor => "sensor",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an entity measures or detects; drives icons and units in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    // binary sensors
    Battery,
    Door,
    Moisture,
    Motion,
    Smoke,
    Window,
    // sensors
    Energy,
    Humidity,
    Power,
    Temperature,
}

/// How a numeric sensor value evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Secondary entities that are not the main purpose of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

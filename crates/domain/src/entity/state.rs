//! Entity state: the current value an entity reports.

use serde::{Deserialize, Serialize};

/// Reported state of an entity.
///
/// Binary sensors report [`On`](Self::On) / [`Off`](Self::Off); sensors
/// report a [`Numeric`](Self::Numeric) reading or a [`Text`](Self::Text)
/// rating.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum EntityState {
    On,
    Off,
    #[default]
    Unknown,
    Unavailable,
    Numeric(f64),
    Text(String),
}

impl EntityState {
    /// Map a boolean `is_on` into `On` / `Off`.
    #[must_use]
    pub fn from_bool(is_on: bool) -> Self {
        if is_on { Self::On } else { Self::Off }
    }

    /// Whether the entity is reachable (anything but [`Unavailable`](Self::Unavailable)).
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// The numeric reading, if any.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Unknown => f.write_str("unknown"),
            Self::Unavailable => f.write_str("unavailable"),
            Self::Numeric(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

//! Typed identifiers.
//!
//! Every registry key is a random UUID wrapped in its own newtype so an
//! entity id can never be passed where a device id is expected. Parsing
//! yields a [`ValidationError`] directly, which adapters surface as a bad
//! request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId(raw.to_string()))
            }
        }
    };
}

uuid_newtype!(
    /// Registry key of an [`Entity`](crate::entity::Entity).
    EntityId
);

uuid_newtype!(
    /// Registry key of a [`Device`](crate::device::Device).
    DeviceId
);

uuid_newtype!(
    /// Key of a published [`Event`](crate::event::Event).
    EventId
);

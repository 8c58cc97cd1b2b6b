//! State values reported by controller device services.
//!
//! Variants carry the controller's own spelling, available through `name()`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A state string the controller sent that is not known to this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value {value:?}")]
pub struct UnknownState {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! shc_state {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal, default $default:ident) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Name of the value as the controller spells it.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = UnknownState;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownState {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

shc_state! {
    /// `BatteryLevel` service state.
    BatteryLevel ("battery level", default Ok) {
        Ok => "OK",
        LowBattery => "LOW_BATTERY",
        CriticalLow => "CRITICAL_LOW",
        CriticallyLowBattery => "CRITICALLY_LOW_BATTERY",
        NotAvailable => "NOT_AVAILABLE",
    }
}

shc_state! {
    /// `ShutterContact` service state.
    ShutterContactState ("shutter contact", default Closed) {
        Open => "OPEN",
        Closed => "CLOSED",
    }
}

shc_state! {
    /// Smoke detector `Alarm` service state.
    SmokeAlarmState ("alarm", default IdleOff) {
        IdleOff => "IDLE_OFF",
        IntrusionAlarm => "INTRUSION_ALARM",
        SecondaryAlarm => "SECONDARY_ALARM",
        PrimaryAlarm => "PRIMARY_ALARM",
    }
}

shc_state! {
    /// Commands accepted by the smoke detector `Alarm` service.
    AlarmCommand ("alarm command", default AlarmOffRequested) {
        IntrusionAlarmOnRequested => "INTRUSION_ALARM_ON_REQUESTED",
        IntrusionAlarmOffRequested => "INTRUSION_ALARM_OFF_REQUESTED",
        SecondaryAlarmOnRequested => "SECONDARY_ALARM_ON_REQUESTED",
        SecondaryAlarmOffRequested => "SECONDARY_ALARM_OFF_REQUESTED",
        AlarmOffRequested => "ALARM_OFF_REQUESTED",
        AlarmMuteRequested => "ALARM_MUTE_REQUESTED",
    }
}

impl AlarmCommand {
    /// Alarm state the detector settles in once the command is applied.
    #[must_use]
    pub const fn resulting_state(self) -> SmokeAlarmState {
        match self {
            Self::IntrusionAlarmOnRequested => SmokeAlarmState::IntrusionAlarm,
            Self::SecondaryAlarmOnRequested => SmokeAlarmState::SecondaryAlarm,
            Self::IntrusionAlarmOffRequested
            | Self::SecondaryAlarmOffRequested
            | Self::AlarmOffRequested
            | Self::AlarmMuteRequested => SmokeAlarmState::IdleOff,
        }
    }
}

shc_state! {
    /// `SmokeDetectorCheck` service state.
    SmokeDetectorCheckState ("smoke detector check", default None) {
        None => "NONE",
        SmokeTestOk => "SMOKE_TEST_OK",
        SmokeTestRequested => "SMOKE_TEST_REQUESTED",
        SmokeTestFailed => "SMOKE_TEST_FAILED",
        CommunicationTestSent => "COMMUNICATION_TEST_SENT",
        CommunicationTestOk => "COMMUNICATION_TEST_OK",
        CommunicationTestRequested => "COMMUNICATION_TEST_REQUESTED",
    }
}

shc_state! {
    /// `SurveillanceAlarm` service state of the smoke detection system.
    SurveillanceAlarmState ("surveillance alarm", default AlarmOff) {
        AlarmOff => "ALARM_OFF",
        AlarmOn => "ALARM_ON",
        AlarmMuted => "ALARM_MUTED",
        PreAlarm => "PRE_ALARM",
    }
}

shc_state! {
    /// `WaterLeakageSensor` service state.
    LeakageState ("leakage", default NoLeakage) {
        NoLeakage => "NO_LEAKAGE",
        LeakageDetected => "LEAKAGE_DETECTED",
    }
}

shc_state! {
    /// Push notification and acoustic signal settings of a leakage sensor.
    SignalState ("signal", default Enabled) {
        Enabled => "ENABLED",
        Disabled => "DISABLED",
    }
}

shc_state! {
    /// Air quality ratings of a twinguard.
    Rating ("rating", default Unknown) {
        Good => "GOOD",
        Medium => "MEDIUM",
        Bad => "BAD",
        Unknown => "UNKNOWN",
    }
}

shc_state! {
    /// `CommunicationQuality` service state.
    CommunicationQualityState ("communication quality", default Unknown) {
        Bad => "BAD",
        Good => "GOOD",
        Medium => "MEDIUM",
        Normal => "NORMAL",
        Unknown => "UNKNOWN",
        Fetching => "FETCHING",
    }
}

shc_state! {
    /// `ValveTappet` service state of a radiator thermostat.
    ValveTappetState ("valve tappet", default NotAvailable) {
        NotAvailable => "NOT_AVAILABLE",
        RunToStartPosition => "RUN_TO_START_POSITION",
        StartPositionReached => "START_POSITION_REACHED",
        InStartPosition => "IN_START_POSITION",
        ValveAdaptionRequested => "VALVE_ADAPTION_REQUESTED",
        ValveAdaptionInProgress => "VALVE_ADAPTION_IN_PROGRESS",
        ValveAdaptionSuccessful => "VALVE_ADAPTION_SUCCESSFUL",
        ValveTooTight => "VALVE_TOO_TIGHT",
        RangeTooBig => "RANGE_TOO_BIG",
        RangeTooSmall => "RANGE_TOO_SMALL",
        Error => "ERROR",
        NoValveBodyError => "NO_VALVE_BODY_ERROR",
        ValveTooTightError => "VALVE_TOO_TIGHT_ERROR",
        RangeTooBigError => "RANGE_TOO_BIG_ERROR",
        RangeTooSmallError => "RANGE_TOO_SMALL_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_expose_controller_spelling_as_name() {
        assert_eq!(SmokeAlarmState::IdleOff.name(), "IDLE_OFF");
        assert_eq!(BatteryLevel::CriticalLow.name(), "CRITICAL_LOW");
        assert_eq!(ValveTappetState::NoValveBodyError.to_string(), "NO_VALVE_BODY_ERROR");
    }

    #[test]
    fn should_parse_known_value() {
        let state: SurveillanceAlarmState = "PRE_ALARM".parse().unwrap();
        assert_eq!(state, SurveillanceAlarmState::PreAlarm);
    }

    #[test]
    fn should_reject_unknown_value_with_kind() {
        let err = "BOOM".parse::<AlarmCommand>().unwrap_err();
        assert_eq!(err.kind, "alarm command");
        assert_eq!(err.to_string(), "unknown alarm command value \"BOOM\"");
    }

    #[test]
    fn should_deserialize_from_controller_spelling() {
        let level: BatteryLevel = serde_json::from_str("\"LOW_BATTERY\"").unwrap();
        assert_eq!(level, BatteryLevel::LowBattery);
        let json = serde_json::to_string(&LeakageState::LeakageDetected).unwrap();
        assert_eq!(json, "\"LEAKAGE_DETECTED\"");
    }

    #[test]
    fn should_map_alarm_commands_to_resulting_state() {
        assert_eq!(
            AlarmCommand::IntrusionAlarmOnRequested.resulting_state(),
            SmokeAlarmState::IntrusionAlarm
        );
        assert_eq!(
            AlarmCommand::AlarmMuteRequested.resulting_state(),
            SmokeAlarmState::IdleOff
        );
    }

    #[test]
    fn should_default_to_quiet_states() {
        assert_eq!(SmokeAlarmState::default(), SmokeAlarmState::IdleOff);
        assert_eq!(LeakageState::default(), LeakageState::NoLeakage);
        assert_eq!(BatteryLevel::default(), BatteryLevel::Ok);
    }
}

//! On/off sensors derived from channel snapshots.

use carwatch_types::{Channel, ChargeState, FieldValue, PlugState, Snapshot};

use crate::vehicle::VehicleSpec;

/// A value a binary sensor compares against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnValue {
    Number(f64),
    Text(&'static str),
}

impl OnValue {
    fn matches(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (OnValue::Number(expected), FieldValue::Number(actual)) => {
                (expected - actual).abs() < 1e-6
            }
            (OnValue::Text(expected), FieldValue::Text(actual)) => *expected == actual.as_str(),
            _ => false,
        }
    }
}

/// Static description of a binary sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub channel: Channel,
    pub on_key: &'static str,
    pub on_values: &'static [OnValue],
    /// Consulted only when `on_key` is missing. A negative answer from the
    /// secondary field means unknown, not off.
    pub secondary: Option<(&'static str, &'static [OnValue])>,
}

impl BinarySensorDescription {
    const fn new(
        key: &'static str,
        channel: Channel,
        on_key: &'static str,
        on_values: &'static [OnValue],
    ) -> Self {
        Self {
            key,
            channel,
            on_key,
            on_values,
            secondary: None,
        }
    }

    /// State of the sensor, or `None` when it cannot be told.
    pub fn is_on(&self, snapshot: Option<&Snapshot>) -> Option<bool> {
        let snapshot = snapshot?;
        if let Some(value) = snapshot.get(self.on_key) {
            return Some(self.on_values.iter().any(|v| v.matches(value)));
        }

        let (key, values) = self.secondary?;
        let value = snapshot.get(key)?;
        values.iter().any(|v| v.matches(value)).then_some(true)
    }

    pub fn applies_to(&self, spec: &VehicleSpec) -> bool {
        spec.supports(self.channel)
    }
}

// Codes are spelled out because `code()` is not const.
const PLUGGED: &[OnValue] = &[OnValue::Number(1.0)];
const CHARGING: &[OnValue] = &[OnValue::Number(1.0)];
const PLUGGED_CHARGE_STATES: &[OnValue] = &[
    OnValue::Number(1.0),
    OnValue::Number(0.1),
    OnValue::Number(0.3),
    OnValue::Number(0.2),
    OnValue::Number(-1.3),
    OnValue::Number(-1.6),
    OnValue::Number(-1.5),
    OnValue::Number(-1.4),
];
const ON: &[OnValue] = &[OnValue::Text("on")];
const UNLOCKED: &[OnValue] = &[OnValue::Text("unlocked")];
const OPEN: &[OnValue] = &[OnValue::Text("open")];

/// Every known binary sensor.
pub const BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        secondary: Some(("chargingStatus", PLUGGED_CHARGE_STATES)),
        ..BinarySensorDescription::new("plugged_in", Channel::Battery, "plugStatus", PLUGGED)
    },
    BinarySensorDescription::new("charging", Channel::Battery, "chargingStatus", CHARGING),
    BinarySensorDescription::new("hvac_status", Channel::Hvac, "hvacStatus", ON),
    BinarySensorDescription::new("lock_status", Channel::Lock, "lockStatus", UNLOCKED),
    BinarySensorDescription::new("hatch_status", Channel::Lock, "hatchStatus", OPEN),
    BinarySensorDescription::new(
        "rear_left_door_status",
        Channel::Lock,
        "doorStatusRearLeft",
        OPEN,
    ),
    BinarySensorDescription::new(
        "rear_right_door_status",
        Channel::Lock,
        "doorStatusRearRight",
        OPEN,
    ),
    BinarySensorDescription::new("driver_door_status", Channel::Lock, "doorStatusDriver", OPEN),
    BinarySensorDescription::new(
        "passenger_door_status",
        Channel::Lock,
        "doorStatusPassenger",
        OPEN,
    ),
];

/// Binary sensors a vehicle exposes.
pub fn binary_sensors_for(
    spec: &VehicleSpec,
) -> impl Iterator<Item = &'static BinarySensorDescription> + '_ {
    BINARY_SENSORS.iter().filter(move |d| d.applies_to(spec))
}

/// Look up the binary sensor a vehicle exposes under `key`.
pub fn find(spec: &VehicleSpec, key: &str) -> Option<&'static BinarySensorDescription> {
    binary_sensors_for(spec).find(|d| d.key == key)
}

//! Derived sensor values.
//!
//! Each sensor reads one field of one channel snapshot and turns it into a
//! consumer-facing value. The transformation is picked by a [`SensorKind`]
//! tag and evaluated by a pure function.

use carwatch_types::{Channel, FieldValue, Snapshot};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::vehicle::VehicleSpec;

use Channel::*;
use SensorKind::*;

/// How a sensor value is derived from its raw field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// The field as reported.
    Raw,
    /// The sanitized battery level.
    BatteryLevel,
    /// `chargingStatus` decoded and rendered as a snake-case name.
    ChargeStateName,
    /// `plugStatus` decoded and rendered as a snake-case name.
    PlugStateName,
    /// Watts converted to kilowatts.
    PowerKilowatts,
    /// Rounded to the nearest integer.
    Rounded,
    /// RFC 3339 timestamp normalised to UTC.
    UtcTimestamp,
}

/// What a sensor needs as input besides the channel snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorInput<'a> {
    pub snapshot: Option<&'a Snapshot>,
    /// Output of the battery sanitizer for the latest battery snapshot.
    pub battery_level: Option<f64>,
}

impl SensorKind {
    /// Derive a value from `data_key` of the input snapshot.
    ///
    /// Returns `None` when there is no snapshot, the field is missing, or the
    /// field cannot be converted.
    pub fn derive(&self, data_key: &str, input: &SensorInput<'_>) -> Option<FieldValue> {
        let snapshot = input.snapshot?;
        let raw = snapshot.get(data_key)?;
        match self {
            SensorKind::Raw => Some(raw.clone()),
            SensorKind::BatteryLevel => input.battery_level.map(FieldValue::Number),
            SensorKind::ChargeStateName => snapshot.charge_state().map(|s| s.name().into()),
            SensorKind::PlugStateName => snapshot.plug_state().map(|s| s.name().into()),
            SensorKind::PowerKilowatts => raw.as_f64().map(|w| FieldValue::Number(w / 1000.0)),
            SensorKind::Rounded => raw.as_f64().map(|v| FieldValue::Number(v.round())),
            SensorKind::UtcTimestamp => raw.as_str().and_then(to_utc).map(FieldValue::Text),
        }
    }
}

fn to_utc(value: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(value).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Vehicle capability a sensor depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    RequiresFuel,
    /// Charging power already reported in kW.
    PowerInKilowatts,
    /// Charging power reported in W.
    PowerInWatts,
}

impl Condition {
    fn holds(&self, spec: &VehicleSpec) -> bool {
        match self {
            Condition::Always => true,
            Condition::RequiresFuel => spec.uses_fuel,
            Condition::PowerInKilowatts => !spec.reports_charging_power_in_watts,
            Condition::PowerInWatts => spec.reports_charging_power_in_watts,
        }
    }
}

/// Static description of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub key: &'static str,
    pub channel: Channel,
    pub data_key: &'static str,
    pub kind: SensorKind,
    pub condition: Condition,
    pub enabled_by_default: bool,
}

impl SensorDescription {
    const fn new(
        key: &'static str,
        channel: Channel,
        data_key: &'static str,
        kind: SensorKind,
    ) -> Self {
        Self {
            key,
            channel,
            data_key,
            kind,
            condition: Condition::Always,
            enabled_by_default: true,
        }
    }

    const fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    const fn disabled(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    /// True if a vehicle with this spec exposes the sensor.
    pub fn applies_to(&self, spec: &VehicleSpec) -> bool {
        spec.supports(self.channel) && self.condition.holds(spec)
    }

    /// Evaluate the sensor.
    pub fn value(&self, input: &SensorInput<'_>) -> Option<FieldValue> {
        self.kind.derive(self.data_key, input)
    }
}

/// Every known sensor.
///
/// `charging_power` appears twice; exactly one of the two applies to any
/// vehicle.
pub const SENSORS: &[SensorDescription] = &[
    SensorDescription::new("battery_level", Battery, "batteryLevel", BatteryLevel),
    SensorDescription::new("charge_state", Battery, "chargingStatus", ChargeStateName),
    SensorDescription::new("charging_remaining_time", Battery, "chargingRemainingTime", Raw),
    SensorDescription::new("charging_power", Battery, "chargingInstantaneousPower", Raw)
        .when(Condition::PowerInKilowatts),
    SensorDescription::new("charging_power", Battery, "chargingInstantaneousPower", PowerKilowatts)
        .when(Condition::PowerInWatts),
    SensorDescription::new("plug_state", Battery, "plugStatus", PlugStateName),
    SensorDescription::new("battery_autonomy", Battery, "batteryAutonomy", Raw),
    SensorDescription::new("battery_available_energy", Battery, "batteryAvailableEnergy", Raw),
    SensorDescription::new("battery_temperature", Battery, "batteryTemperature", Raw),
    SensorDescription::new("battery_last_activity", Battery, "timestamp", UtcTimestamp).disabled(),
    SensorDescription::new("charge_mode", ChargeMode, "chargeMode", Raw),
    SensorDescription::new("mileage", Cockpit, "totalMileage", Rounded),
    SensorDescription::new("fuel_autonomy", Cockpit, "fuelAutonomy", Rounded)
        .when(Condition::RequiresFuel),
    SensorDescription::new("fuel_quantity", Cockpit, "fuelQuantity", Rounded)
        .when(Condition::RequiresFuel),
    SensorDescription::new("outside_temperature", Hvac, "externalTemperature", Raw),
    SensorDescription::new("hvac_soc_threshold", Hvac, "socThreshold", Raw),
    SensorDescription::new("hvac_last_activity", Hvac, "lastUpdateTime", UtcTimestamp).disabled(),
    SensorDescription::new("location_last_activity", Location, "lastUpdateTime", UtcTimestamp)
        .disabled(),
    SensorDescription::new("res_state", ResState, "details", Raw),
    SensorDescription::new("res_state_code", ResState, "code", Raw).disabled(),
];

/// Sensors a vehicle exposes.
pub fn sensors_for(spec: &VehicleSpec) -> impl Iterator<Item = &'static SensorDescription> + '_ {
    SENSORS.iter().filter(move |d| d.applies_to(spec))
}

/// Look up the sensor a vehicle exposes under `key`.
pub fn find(spec: &VehicleSpec, key: &str) -> Option<&'static SensorDescription> {
    sensors_for(spec).find(|d| d.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(channel: Channel, key: &str, value: impl Into<FieldValue>) -> Snapshot {
        Snapshot::builder(channel).field(key, value).build()
    }

    fn input(snapshot: &Snapshot) -> SensorInput<'_> {
        SensorInput {
            snapshot: Some(snapshot),
            battery_level: None,
        }
    }

    #[test]
    fn raw_passes_through() {
        let s = snapshot(Hvac, "externalTemperature", 8.0);
        assert_eq!(
            Raw.derive("externalTemperature", &input(&s)),
            Some(FieldValue::Number(8.0))
        );
    }

    #[test]
    fn missing_snapshot_or_field_is_none() {
        let s = snapshot(Hvac, "externalTemperature", 8.0);
        assert_eq!(Raw.derive("socThreshold", &input(&s)), None);
        assert_eq!(Raw.derive("externalTemperature", &SensorInput::default()), None);
    }

    #[test]
    fn battery_level_reads_sanitized_value() {
        let s = snapshot(Battery, "batteryLevel", 100.0);
        let input = SensorInput {
            snapshot: Some(&s),
            battery_level: Some(41.0),
        };
        assert_eq!(
            BatteryLevel.derive("batteryLevel", &input),
            Some(FieldValue::Number(41.0))
        );
    }

    #[test]
    fn state_names() {
        let s = Snapshot::builder(Battery)
            .field("chargingStatus", 1.0)
            .field("plugStatus", 1)
            .build();
        assert_eq!(
            ChargeStateName.derive("chargingStatus", &input(&s)),
            Some(FieldValue::from("charge_in_progress"))
        );
        assert_eq!(
            PlugStateName.derive("plugStatus", &input(&s)),
            Some(FieldValue::from("plugged"))
        );
    }

    #[test]
    fn unknown_charge_code_has_no_name() {
        let s = snapshot(Battery, "chargingStatus", 0.7);
        assert_eq!(ChargeStateName.derive("chargingStatus", &input(&s)), None);
    }

    #[test]
    fn watts_to_kilowatts() {
        let s = snapshot(Battery, "chargingInstantaneousPower", 7400.0);
        assert_eq!(
            PowerKilowatts.derive("chargingInstantaneousPower", &input(&s)),
            Some(FieldValue::Number(7.4))
        );
    }

    #[test]
    fn rounded() {
        let s = snapshot(Cockpit, "totalMileage", 49114.27);
        assert_eq!(
            Rounded.derive("totalMileage", &input(&s)),
            Some(FieldValue::Number(49114.0))
        );
    }

    #[test]
    fn timestamps_normalised_to_utc() {
        let s = snapshot(Hvac, "lastUpdateTime", "2020-12-03T00:00:00+02:00");
        assert_eq!(
            UtcTimestamp.derive("lastUpdateTime", &input(&s)),
            Some(FieldValue::from("2020-12-02T22:00:00Z"))
        );

        let bad = snapshot(Hvac, "lastUpdateTime", "yesterday");
        assert_eq!(UtcTimestamp.derive("lastUpdateTime", &input(&bad)), None);
    }

    #[test]
    fn fuel_sensors_need_fuel() {
        let electric = VehicleSpec::new("VF1AAAAA555777999", "X101VE");
        let hybrid = VehicleSpec::new("VF1AAAAA555777123", "XJB1SU").uses_fuel(true);

        assert!(find(&electric, "fuel_autonomy").is_none());
        assert!(find(&hybrid, "fuel_autonomy").is_some());
        assert!(find(&electric, "mileage").is_some());
    }

    #[test]
    fn exactly_one_charging_power_applies() {
        for watts in [false, true] {
            let spec = VehicleSpec::new("VF1", "X102VE").charging_power_in_watts(watts);
            let matches: Vec<_> = sensors_for(&spec)
                .filter(|d| d.key == "charging_power")
                .collect();
            assert_eq!(matches.len(), 1);
            let expected = if watts { PowerKilowatts } else { Raw };
            assert_eq!(matches[0].kind, expected);
        }
    }

    #[test]
    fn sensors_follow_supported_channels() {
        let spec = VehicleSpec::new("VF1", "X071VE").with_channels([Battery, Lock]);
        assert!(sensors_for(&spec).all(|d| d.channel == Battery));
        assert!(find(&spec, "outside_temperature").is_none());
    }

    #[test]
    fn disabled_by_default_flags() {
        let spec = VehicleSpec::new("VF1", "X071VE");
        assert!(!find(&spec, "res_state_code").unwrap().enabled_by_default);
        assert!(find(&spec, "res_state").unwrap().enabled_by_default);
    }
}

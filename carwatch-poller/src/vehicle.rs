//! A registered vehicle: its coordinators, cooldown and sanitizer.

use std::collections::BTreeMap;
use std::sync::Arc;

use carwatch_types::{Channel, ChannelHealth, FieldValue, Snapshot, VehicleView};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::binary;
use crate::coordinator::{ChannelCoordinator, TickOutcome};
use crate::cooldown::CooldownController;
use crate::error::PollError;
use crate::fetch::Fetcher;
use crate::gate::RateGate;
use crate::sanitizer::{GaugeInput, GaugeSignal, ReadingSanitizer, SanitizedReading};
use crate::sensors::{self, SensorInput};
use crate::settings::PollSettings;

/// Identity and capabilities of a vehicle.
///
/// Fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub vin: String,
    pub model_id: String,
    #[serde(default)]
    pub uses_fuel: bool,
    #[serde(default)]
    pub reports_charging_power_in_watts: bool,
    /// Channels this vehicle is polled for.
    #[serde(default = "all_channels")]
    pub channels: Vec<Channel>,
}

fn all_channels() -> Vec<Channel> {
    Channel::ALL.to_vec()
}

impl VehicleSpec {
    /// A vehicle supporting every channel.
    pub fn new(vin: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            vin: vin.into(),
            model_id: model_id.into(),
            uses_fuel: false,
            reports_charging_power_in_watts: false,
            channels: all_channels(),
        }
    }

    /// Restrict the polled channels. Duplicates are dropped.
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        let mut channels: Vec<Channel> = channels.into_iter().collect();
        channels.sort();
        channels.dedup();
        self.channels = channels;
        self
    }

    pub fn uses_fuel(mut self, uses_fuel: bool) -> Self {
        self.uses_fuel = uses_fuel;
        self
    }

    pub fn charging_power_in_watts(mut self, watts: bool) -> Self {
        self.reports_charging_power_in_watts = watts;
        self
    }

    pub fn supports(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }
}

/// Live state of one vehicle.
#[derive(Debug)]
pub struct VehicleState {
    spec: VehicleSpec,
    cooldown: Arc<CooldownController>,
    coordinators: BTreeMap<Channel, Arc<ChannelCoordinator>>,
    sanitizer: Mutex<ReadingSanitizer>,
    battery_level: RwLock<Option<SanitizedReading>>,
}

impl VehicleState {
    /// Build one coordinator per supported channel, all sharing `gate` and a
    /// fresh cooldown.
    pub fn new(
        spec: VehicleSpec,
        fetcher: Arc<dyn Fetcher>,
        gate: &RateGate,
        settings: &PollSettings,
    ) -> Self {
        let cooldown = Arc::new(CooldownController::new(settings.cooldown));
        let interval = settings.interval_for(spec.channels.len());
        let coordinators = spec
            .channels
            .iter()
            .map(|&channel| {
                let coordinator = ChannelCoordinator::new(
                    channel,
                    interval,
                    fetcher.clone(),
                    gate.clone(),
                    cooldown.clone(),
                );
                (channel, Arc::new(coordinator))
            })
            .collect();
        let sanitizer = ReadingSanitizer::for_model(&spec.model_id, &settings.defect_profiles);

        tracing::debug!(
            vin = %spec.vin,
            model = %spec.model_id,
            channels = spec.channels.len(),
            interval_secs = interval.as_secs(),
            sanitized = sanitizer.is_active(),
            "vehicle registered"
        );

        Self {
            spec,
            cooldown,
            coordinators,
            sanitizer: Mutex::new(sanitizer),
            battery_level: RwLock::new(None),
        }
    }

    pub fn spec(&self) -> &VehicleSpec {
        &self.spec
    }

    pub fn cooldown(&self) -> &CooldownController {
        &self.cooldown
    }

    pub fn coordinator(&self, channel: Channel) -> Option<&Arc<ChannelCoordinator>> {
        self.coordinators.get(&channel)
    }

    /// Channels with a coordinator, in polling order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.coordinators.keys().copied()
    }

    /// Tick one channel. Accepted battery snapshots go through the sanitizer.
    ///
    /// A channel the vehicle does not support reports `Disabled`.
    pub async fn refresh(&self, channel: Channel) -> Result<TickOutcome, PollError> {
        let Some(coordinator) = self.coordinators.get(&channel) else {
            return Ok(TickOutcome::Disabled);
        };

        if channel == Channel::Battery {
            coordinator.tick_with(|snapshot| self.sanitize(snapshot)).await
        } else {
            coordinator.tick().await
        }
    }

    fn sanitize(&self, snapshot: &Snapshot) {
        let input = GaugeInput::from_snapshot(snapshot, Instant::now());
        let reading = self.sanitizer.lock().evaluate(&input);
        *self.battery_level.write() = Some(reading);
    }

    /// Latest snapshot of a channel.
    pub fn snapshot(&self, channel: Channel) -> Option<Arc<Snapshot>> {
        self.coordinators.get(&channel)?.snapshot()
    }

    /// Health of a channel. Channels without a coordinator are unsupported.
    pub fn channel_health(&self, channel: Channel) -> ChannelHealth {
        self.coordinators
            .get(&channel)
            .map_or(ChannelHealth::Unsupported, |c| c.health())
    }

    /// Corrected value of a gauge signal.
    pub fn sanitized(&self, signal: GaugeSignal) -> Option<f64> {
        match signal {
            GaugeSignal::BatteryLevel => self.battery_reading().and_then(|r| r.value),
        }
    }

    /// Full sanitizer output for the latest battery snapshot.
    pub fn battery_reading(&self) -> Option<SanitizedReading> {
        *self.battery_level.read()
    }

    /// Value of a derived sensor.
    pub fn sensor(&self, key: &str) -> Option<FieldValue> {
        let description = sensors::find(&self.spec, key)?;
        let snapshot = self.snapshot(description.channel);
        description.value(&SensorInput {
            snapshot: snapshot.as_deref(),
            battery_level: self.sanitized(GaugeSignal::BatteryLevel),
        })
    }

    /// State of a binary sensor.
    pub fn binary_sensor(&self, key: &str) -> Option<bool> {
        let description = binary::find(&self.spec, key)?;
        description.is_on(self.snapshot(description.channel).as_deref())
    }

    /// Serializable view of the vehicle.
    ///
    /// Sensors disabled by default are left out, as are values that are
    /// currently unknown.
    pub fn view(&self) -> VehicleView {
        let channels = self
            .coordinators
            .iter()
            .map(|(channel, coordinator)| (*channel, coordinator.view()))
            .collect();

        let battery_level = self.sanitized(GaugeSignal::BatteryLevel);
        let mut sensor_values = BTreeMap::new();
        for description in sensors::sensors_for(&self.spec).filter(|d| d.enabled_by_default) {
            let snapshot = self.snapshot(description.channel);
            let input = SensorInput {
                snapshot: snapshot.as_deref(),
                battery_level,
            };
            if let Some(value) = description.value(&input) {
                sensor_values.insert(description.key.to_string(), value);
            }
        }

        let binary_sensors = binary::binary_sensors_for(&self.spec)
            .filter_map(|d| {
                d.is_on(self.snapshot(d.channel).as_deref())
                    .map(|on| (d.key.to_string(), on))
            })
            .collect();

        VehicleView {
            model_id: self.spec.model_id.clone(),
            channels,
            sensors: sensor_values,
            binary_sensors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::sanitizer::{SuppressReason, Verdict};
    use crate::testing::{battery, ScriptedFetcher};
    use std::time::Duration;

    fn vehicle(spec: VehicleSpec, fetcher: &Arc<ScriptedFetcher>) -> VehicleState {
        VehicleState::new(spec, fetcher.clone(), &RateGate::new(), &PollSettings::default())
    }

    #[test]
    fn with_channels_sorts_and_dedups() {
        let spec = VehicleSpec::new("VF1", "X071VE").with_channels([
            Channel::Lock,
            Channel::Battery,
            Channel::Lock,
        ]);
        assert_eq!(spec.channels, vec![Channel::Battery, Channel::Lock]);
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: VehicleSpec =
            serde_json::from_str(r#"{"vin":"VF1","model_id":"X101VE"}"#).unwrap();
        assert_eq!(spec.channels.len(), 7);
        assert!(!spec.uses_fuel);
    }

    #[tokio::test(start_paused = true)]
    async fn coordinators_follow_spec() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let state = vehicle(
            VehicleSpec::new("VF1", "X071VE").with_channels([Channel::Battery, Channel::Lock]),
            &fetcher,
        );

        assert_eq!(
            state.channels().collect::<Vec<_>>(),
            vec![Channel::Battery, Channel::Lock]
        );
        assert_eq!(state.channel_health(Channel::Hvac), ChannelHealth::Unsupported);
        assert_eq!(state.refresh(Channel::Hvac).await, Ok(TickOutcome::Disabled));
        assert_eq!(fetcher.total_calls(), 0);

        // Seven channels at 100 calls per hour would be 252 s; two give 72 s.
        assert_eq!(
            state.coordinator(Channel::Lock).unwrap().interval(),
            Some(Duration::from_secs(72))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn battery_level_is_sanitized_on_acceptance() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_ok(battery(41.0, 0.0, 1, 41.0));
        fetcher.push_ok(battery(100.0, 0.3, 1, 41.0));
        let state = vehicle(VehicleSpec::new("VF1", "X071VE"), &fetcher);

        state.refresh(Channel::Battery).await.unwrap();
        assert_eq!(state.sanitized(GaugeSignal::BatteryLevel), Some(41.0));

        state.refresh(Channel::Battery).await.unwrap();
        assert_eq!(state.sanitized(GaugeSignal::BatteryLevel), Some(41.0));
        assert_eq!(
            state.battery_reading().unwrap().verdict,
            Verdict::Suppressed(SuppressReason::UncertainChargeState)
        );
        assert_eq!(state.sensor("battery_level"), Some(FieldValue::Number(41.0)));

        // The raw snapshot is untouched.
        let raw = state.snapshot(Channel::Battery).unwrap();
        assert_eq!(raw.get_f64("batteryLevel"), Some(100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_advance_the_sanitizer() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_ok(battery(60.0, 1.0, 1, 110.0));
        fetcher.push_ok(battery(100.0, 1.0, 1, 185.0));
        let state = vehicle(VehicleSpec::new("VF1", "X071VE"), &fetcher);

        state.refresh(Channel::Battery).await.unwrap();
        tokio::time::advance(Duration::from_secs(3 * 3600)).await;
        state.refresh(Channel::Battery).await.unwrap();

        for _ in 0..5 {
            assert_eq!(state.sensor("battery_level"), Some(FieldValue::Number(100.0)));
        }
        assert_eq!(state.battery_reading().unwrap().verdict, Verdict::Plausible);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_refreshes_sanitize_each_snapshot_once() {
        let fetcher = Arc::new(ScriptedFetcher::with_latency(Duration::from_millis(2)));
        for level in 1..=16 {
            fetcher.push_ok(battery(f64::from(level) * 5.0, 0.0, 0, 100.0));
        }
        let state = Arc::new(vehicle(
            VehicleSpec::new("VF1", "X071VE").with_channels([Channel::Battery]),
            &fetcher,
        ));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { state.refresh(Channel::Battery).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(TickOutcome::Updated));
        }

        let stored = state.snapshot(Channel::Battery).unwrap();
        let trusted = state.sanitizer.lock().state().last_trusted.unwrap();
        assert_eq!(stored.get_f64("batteryLevel"), Some(trusted.percent));
        assert_eq!(state.sanitized(GaugeSignal::BatteryLevel), Some(80.0));
    }

    #[tokio::test(start_paused = true)]
    async fn other_models_pass_through() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_ok(battery(100.0, 0.3, -2147483648, 12.0));
        let state = vehicle(VehicleSpec::new("VF1", "XBG1VE"), &fetcher);

        state.refresh(Channel::Battery).await.unwrap();
        assert_eq!(state.sanitized(GaugeSignal::BatteryLevel), Some(100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_battery_refresh_keeps_sanitized_value() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_ok(battery(55.0, 0.0, 0, 90.0));
        fetcher.push(Channel::Battery, Err(FetchError::Remote("timeout".into())));
        let state = vehicle(VehicleSpec::new("VF1", "X071VE"), &fetcher);

        state.refresh(Channel::Battery).await.unwrap();
        assert!(state.refresh(Channel::Battery).await.is_err());
        assert_eq!(state.sanitized(GaugeSignal::BatteryLevel), Some(55.0));
    }

    #[tokio::test(start_paused = true)]
    async fn view_collects_sensors() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_ok(battery(80.0, 1.0, 1, 150.0));
        fetcher.push_ok(
            Snapshot::builder(Channel::Lock)
                .field("lockStatus", "locked")
                .field("doorStatusDriver", "open")
                .build(),
        );
        fetcher.push(Channel::ResState, Err(FetchError::NotSupported("501".into())));
        let state = vehicle(
            VehicleSpec::new("VF1", "X071VE").with_channels([
                Channel::Battery,
                Channel::Lock,
                Channel::ResState,
            ]),
            &fetcher,
        );

        for channel in [Channel::Battery, Channel::Lock, Channel::ResState] {
            let _ = state.refresh(channel).await;
        }

        let view = state.view();
        assert_eq!(view.model_id, "X071VE");
        assert_eq!(view.channels.len(), 3);
        assert_eq!(
            view.channels[&Channel::ResState].health,
            ChannelHealth::Unsupported
        );
        assert_eq!(view.sensors["battery_level"], FieldValue::Number(80.0));
        assert_eq!(view.sensors["charge_state"], FieldValue::from("charge_in_progress"));
        assert_eq!(view.sensors["plug_state"], FieldValue::from("plugged"));
        assert!(!view.sensors.contains_key("res_state"));
        assert!(view.binary_sensors["charging"]);
        assert!(view.binary_sensors["plugged_in"]);
        assert!(!view.binary_sensors["lock_status"]);
        assert!(view.binary_sensors["driver_door_status"]);
        assert!(!view.binary_sensors.contains_key("hatch_status"));
    }
}

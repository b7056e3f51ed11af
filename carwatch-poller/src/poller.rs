//! The main Poller type: registration, scheduling and export.

use std::sync::Arc;
use std::time::Duration;

use carwatch_types::{Channel, FleetView};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::fetch::Fetcher;
use crate::gate::RateGate;
use crate::handle::VehicleHandle;
use crate::output::Output;
use crate::sanitizer::DefectProfile;
use crate::settings::PollSettings;
use crate::state::FleetState;
use crate::vehicle::{VehicleSpec, VehicleState};

const DEFAULT_EXPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Entry point for polling a fleet of vehicles.
///
/// A Poller owns the process-wide [`RateGate`], one set of coordinators per
/// registered vehicle, and the outputs the read model is exported to.
///
/// # Example
///
/// ```rust,no_run
/// use carwatch_poller::{Output, Poller, VehicleSpec};
/// # use carwatch_poller::{FetchError, Fetcher};
/// # use carwatch_types::{Channel, Snapshot};
/// use std::sync::Arc;
/// use std::time::Duration;
/// # #[derive(Debug)]
/// # struct Api;
/// # #[async_trait::async_trait]
/// # impl Fetcher for Api {
/// #     async fn fetch(&self, _: Channel) -> Result<Snapshot, FetchError> {
/// #         Err(FetchError::Remote("offline".into()))
/// #     }
/// #     fn description(&self) -> &str { "api" }
/// # }
///
/// #[tokio::main]
/// async fn main() {
///     let poller = Poller::builder()
///         .output(Output::file("fleet.json"))
///         .export_interval(Duration::from_secs(60))
///         .build();
///
///     let car = poller.register(VehicleSpec::new("VF1AAAAA555777999", "X071VE"), Arc::new(Api));
///
///     poller.first_refresh().await;
///     let handle = poller.start();
///
///     tokio::time::sleep(Duration::from_secs(3600)).await;
///     println!("{:?}", car.sensor("battery_level"));
///     handle.shutdown().await;
/// }
/// ```
#[derive(Debug)]
pub struct Poller {
    state: Arc<FleetState>,
    gate: RateGate,
    settings: PollSettings,
    outputs: Arc<Vec<Output>>,
    export_interval: Duration,
}

/// Counts from [`Poller::first_refresh`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Channels that stored a fresh snapshot.
    pub updated: usize,
    /// Channels skipped or served from the previous snapshot.
    pub skipped: usize,
    /// Channels whose refresh failed.
    pub failed: usize,
}

impl Poller {
    /// Create a poller with default settings and no outputs.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> PollerBuilder {
        PollerBuilder::new()
    }

    /// Register a vehicle and get a handle to its data.
    ///
    /// If a vehicle with this VIN is already registered, returns a handle to
    /// the existing one and `fetcher` is dropped. Vehicles registered after
    /// [`start`](Self::start) are not scheduled by that run.
    pub fn register(&self, spec: VehicleSpec, fetcher: Arc<dyn Fetcher>) -> VehicleHandle {
        let vin = spec.vin.clone();
        let state = self.state.register_with(&vin, || {
            VehicleState::new(spec, fetcher, &self.gate, &self.settings)
        });
        VehicleHandle { state }
    }

    /// Unregister a vehicle. Returns `true` if it was registered.
    pub fn unregister(&self, vin: &str) -> bool {
        self.state.unregister(vin)
    }

    /// Handle to a registered vehicle.
    pub fn vehicle(&self, vin: &str) -> Option<VehicleHandle> {
        self.state.get(vin).map(|state| VehicleHandle { state })
    }

    /// Handles to every registered vehicle.
    pub fn vehicles(&self) -> Vec<VehicleHandle> {
        self.state
            .vehicles()
            .into_iter()
            .map(|state| VehicleHandle { state })
            .collect()
    }

    /// The process-wide gate every fetch goes through.
    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Collect the read model of every vehicle.
    pub fn collect(&self) -> FleetView {
        self.state.collect()
    }

    /// Tick every channel of every vehicle once.
    ///
    /// Failures are logged, not returned; they still disable channels that
    /// are denied or unsupported.
    pub async fn first_refresh(&self) -> RefreshReport {
        let mut tasks = JoinSet::new();
        for vehicle in self.state.vehicles() {
            for channel in vehicle.channels().collect::<Vec<_>>() {
                let vehicle = vehicle.clone();
                tasks.spawn(async move { (channel, vehicle.refresh(channel).await) });
            }
        }

        let mut report = RefreshReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) if outcome.is_fresh() => report.updated += 1,
                Ok((_, Ok(_))) => report.skipped += 1,
                Ok((channel, Err(err))) => {
                    tracing::debug!(%channel, error = %err, "first refresh failed");
                    report.failed += 1;
                }
                Err(err) => {
                    tracing::error!(error = %err, "first refresh task panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Start background polling and export.
    ///
    /// Spawns one task per channel of every registered vehicle, each ticking
    /// on its coordinator's interval, plus one export task if outputs are
    /// configured. The first scheduled tick happens one interval from now.
    pub fn start(&self) -> PollingHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        for vehicle in self.state.vehicles() {
            for channel in vehicle.channels() {
                tasks.push(tokio::spawn(run_channel(
                    vehicle.clone(),
                    channel,
                    stop_rx.clone(),
                )));
            }
        }

        if !self.outputs.is_empty() {
            tasks.push(tokio::spawn(run_export(
                self.state.clone(),
                self.outputs.clone(),
                self.export_interval,
                stop_rx,
            )));
        }

        PollingHandle { stop_tx, tasks }
    }

    /// Emit the read model to all outputs immediately.
    pub async fn emit_now(&self) {
        let view = self.state.collect();
        for output in self.outputs.iter() {
            if let Err(err) = output.emit(&view).await {
                tracing::warn!(error = %err, "export failed");
            }
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_channel(
    vehicle: Arc<VehicleState>,
    channel: Channel,
    mut stop_rx: watch::Receiver<bool>,
) {
    let interval_of = |v: &VehicleState| v.coordinator(channel).and_then(|c| c.interval());
    let Some(period) = interval_of(&vehicle) else {
        return;
    };

    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let vin = vehicle.spec().vin.clone();

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match vehicle.refresh(channel).await {
                    Ok(outcome) => {
                        tracing::trace!(%vin, %channel, ?outcome, "tick");
                    }
                    Err(err) if err.is_permanent() => {}
                    Err(err) => {
                        tracing::warn!(%vin, %channel, error = %err, "update failed");
                    }
                }
                if interval_of(&vehicle).is_none() {
                    tracing::debug!(%vin, %channel, "polling stopped");
                    break;
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}

async fn run_export(
    state: Arc<FleetState>,
    outputs: Arc<Vec<Output>>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut timer = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let view = state.collect();
                for output in outputs.iter() {
                    if let Err(err) = output.emit(&view).await {
                        tracing::warn!(error = %err, "export failed");
                    }
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// Builder for configuring a Poller.
#[derive(Debug, Default)]
pub struct PollerBuilder {
    settings: PollSettings,
    outputs: Vec<Output>,
    export_interval: Option<Duration>,
}

impl PollerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upstream call budget the scan interval is derived from.
    pub fn max_calls_per_hour(mut self, calls: u32) -> Self {
        self.settings.max_calls_per_hour = calls;
        self
    }

    /// Fixed scan interval, overriding the derived one.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.interval = Some(interval);
        self
    }

    /// Cooldown after a throttle response. Defaults to 15 minutes.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.settings.cooldown = cooldown;
        self
    }

    /// Add or replace the defect profile for a model.
    pub fn defect_profile(mut self, profile: DefectProfile) -> Self {
        self.settings
            .defect_profiles
            .retain(|p| p.model_id != profile.model_id);
        self.settings.defect_profiles.push(profile);
        self
    }

    /// Replace all settings at once.
    pub fn settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; views are emitted to all of them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set the export interval. Defaults to 1 minute, which also replaces a
    /// zero interval.
    pub fn export_interval(mut self, interval: Duration) -> Self {
        self.export_interval = Some(interval);
        self
    }

    pub fn build(self) -> Poller {
        Poller {
            state: Arc::new(FleetState::default()),
            gate: RateGate::new(),
            settings: self.settings,
            outputs: Arc::new(self.outputs),
            export_interval: self
                .export_interval
                .filter(|interval| !interval.is_zero())
                .unwrap_or(DEFAULT_EXPORT_INTERVAL),
        }
    }
}

/// Handle for controlling background polling.
///
/// Dropping the handle stops the tasks too.
#[derive(Debug)]
pub struct PollingHandle {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollingHandle {
    /// Ask every task to stop. In-flight fetches run to completion.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait for every task to finish.
    pub async fn shutdown(self) {
        self.stop();
        for task in self.tasks {
            let _ = task.await;
        }
    }

    /// Number of tasks that are still running.
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }
}

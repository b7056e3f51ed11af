//! Consumer handle for one registered vehicle.

use std::sync::Arc;

use carwatch_types::{Channel, ChannelHealth, FieldValue, Snapshot, VehicleView};

use crate::coordinator::TickOutcome;
use crate::error::PollError;
use crate::sanitizer::{GaugeSignal, SanitizedReading};
use crate::vehicle::{VehicleSpec, VehicleState};

/// Read access to one vehicle's latest data.
///
/// Obtain a handle by calling `Poller::register()`. Handles are cheap to
/// clone and stay valid after the vehicle is unregistered, but an
/// unregistered vehicle is no longer scheduled or exported.
///
/// # Example
///
/// ```rust
/// use carwatch_poller::{Poller, VehicleSpec};
/// use carwatch_types::{Channel, ChannelHealth};
/// # use carwatch_poller::{FetchError, Fetcher};
/// # use carwatch_types::Snapshot;
/// # use std::sync::Arc;
/// # #[derive(Debug)]
/// # struct Offline;
/// # #[async_trait::async_trait]
/// # impl Fetcher for Offline {
/// #     async fn fetch(&self, _: Channel) -> Result<Snapshot, FetchError> {
/// #         Err(FetchError::Remote("offline".into()))
/// #     }
/// #     fn description(&self) -> &str { "offline" }
/// # }
///
/// let poller = Poller::new();
/// let handle = poller.register(VehicleSpec::new("VF1AAAAA555777999", "X071VE"), Arc::new(Offline));
///
/// assert!(handle.snapshot(Channel::Battery).is_none());
/// assert_eq!(handle.channel_health(Channel::Battery), ChannelHealth::Healthy);
/// ```
#[derive(Debug, Clone)]
pub struct VehicleHandle {
    pub(crate) state: Arc<VehicleState>,
}

impl VehicleHandle {
    pub fn vin(&self) -> &str {
        &self.state.spec().vin
    }

    pub fn spec(&self) -> &VehicleSpec {
        self.state.spec()
    }

    /// Last accepted snapshot of a channel, or `None` before the first success.
    pub fn snapshot(&self, channel: Channel) -> Option<Arc<Snapshot>> {
        self.state.snapshot(channel)
    }

    /// Corrected reading of an anomaly-prone gauge.
    pub fn sanitized(&self, signal: GaugeSignal) -> Option<f64> {
        self.state.sanitized(signal)
    }

    /// Sanitizer output with the reason for the value.
    pub fn battery_reading(&self) -> Option<SanitizedReading> {
        self.state.battery_reading()
    }

    pub fn channel_health(&self, channel: Channel) -> ChannelHealth {
        self.state.channel_health(channel)
    }

    /// True while the vehicle is in a post-throttle cooldown.
    pub fn is_cooling(&self) -> bool {
        self.state.cooldown().is_cooling()
    }

    /// Value of a derived sensor, e.g. `"battery_level"` or `"mileage"`.
    pub fn sensor(&self, key: &str) -> Option<FieldValue> {
        self.state.sensor(key)
    }

    /// State of a binary sensor, e.g. `"plugged_in"` or `"lock_status"`.
    pub fn binary_sensor(&self, key: &str) -> Option<bool> {
        self.state.binary_sensor(key)
    }

    /// Refresh a channel now, outside its schedule.
    ///
    /// Goes through the same gate, cooldown and failure rules as a scheduled
    /// tick.
    pub async fn refresh(&self, channel: Channel) -> Result<TickOutcome, PollError> {
        self.state.refresh(channel).await
    }

    pub fn view(&self) -> VehicleView {
        self.state.view()
    }
}

//! # carwatch-poller
//!
//! Polling coordinator for rate-limited vehicle telemetry APIs.
//!
//! Every vehicle is polled on several independent channels (battery, lock,
//! HVAC, ...). All fetches in the process share one [`RateGate`], so at most
//! one upstream call is in flight at any time. A throttle response on any
//! channel puts the whole vehicle into a cooldown, and channels the account
//! may not read, or the vehicle does not support, stop polling for good.
//!
//! Battery levels additionally go through a [`ReadingSanitizer`] that hides
//! false full-charge readings on models known to report them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carwatch_poller::{GaugeSignal, Output, Poller, VehicleSpec};
//! # use carwatch_poller::{FetchError, Fetcher};
//! # use carwatch_types::{Channel, Snapshot};
//! use std::sync::Arc;
//! use std::time::Duration;
//! # #[derive(Debug)]
//! # struct Api;
//! # #[async_trait::async_trait]
//! # impl Fetcher for Api {
//! #     async fn fetch(&self, _: Channel) -> Result<Snapshot, FetchError> {
//! #         Err(FetchError::Remote("offline".into()))
//! #     }
//! #     fn description(&self) -> &str { "api" }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let poller = Poller::builder()
//!         .max_calls_per_hour(100)
//!         .output(Output::file("fleet.json"))
//!         .build();
//!
//!     let car = poller.register(VehicleSpec::new("VF1AAAAA555777999", "X071VE"), Arc::new(Api));
//!
//!     poller.first_refresh().await;
//!     let _polling = poller.start();
//!
//!     println!("battery: {:?}", car.sanitized(GaugeSignal::BatteryLevel));
//! }
//! ```
//!
//! ## Features
//!
//! - **One call at a time**: a process-wide gate in front of the upstream API
//! - **Cooldown**: a throttle on one channel pauses every channel of the vehicle
//! - **Stale-data fallback**: throttled channels keep serving their last snapshot
//! - **Permanent demotion**: denied and unsupported channels stop polling
//! - **Sanitized battery level**: configurable per-model plausibility checks

mod binary;
mod cooldown;
mod coordinator;
mod error;
mod fetch;
mod gate;
mod handle;
mod output;
mod poller;
mod sanitizer;
mod sensors;
mod settings;
mod state;
mod vehicle;

#[cfg(test)]
mod testing;

pub use binary::{BinarySensorDescription, OnValue, BINARY_SENSORS};
pub use cooldown::{CooldownController, CooldownState, DEFAULT_COOLDOWN};
pub use coordinator::{ChannelCoordinator, ChannelState, TickOutcome};
pub use error::{FailureClass, PollError};
pub use fetch::{FetchError, Fetcher};
pub use gate::{RateGate, RateTicket};
pub use handle::VehicleHandle;
pub use output::Output;
pub use poller::{Poller, PollerBuilder, PollingHandle, RefreshReport};
pub use sanitizer::{
    DefectProfile, GaugeInput, GaugeSignal, ReadingSanitizer, SanitizedReading, SanitizerState,
    StreakFlags, SuppressReason, TrustedReading, Verdict, FULL,
};
pub use sensors::{Condition, SensorDescription, SensorInput, SensorKind, SENSORS};
pub use settings::{scan_interval, PollSettings, DEFAULT_MAX_CALLS_PER_HOUR};
pub use vehicle::VehicleSpec;

// Re-export types for convenience
pub use carwatch_types::{Channel, ChannelHealth, ChargeState, FleetView, PlugState, Snapshot};

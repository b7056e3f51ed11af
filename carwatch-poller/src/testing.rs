//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use carwatch_types::{Channel, Snapshot};
use parking_lot::Mutex;

use crate::fetch::{FetchError, Fetcher};

/// Fetcher that replays queued responses per channel.
///
/// An empty queue answers with a remote error.
#[derive(Debug, Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<Channel, VecDeque<Result<Snapshot, FetchError>>>>,
    calls: Mutex<HashMap<Channel, usize>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub(crate) fn push(&self, channel: Channel, response: Result<Snapshot, FetchError>) -> &Self {
        self.scripts
            .lock()
            .entry(channel)
            .or_default()
            .push_back(response);
        self
    }

    pub(crate) fn push_ok(&self, snapshot: Snapshot) -> &Self {
        self.push(snapshot.channel, Ok(snapshot))
    }

    pub(crate) fn calls(&self, channel: Channel) -> usize {
        self.calls.lock().get(&channel).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, channel: Channel) -> Result<Snapshot, FetchError> {
        *self.calls.lock().entry(channel).or_default() += 1;
        let response = self
            .scripts
            .lock()
            .get_mut(&channel)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(FetchError::Remote("no scripted response".into())));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        response
    }

    fn description(&self) -> &str {
        "scripted"
    }
}

/// Battery snapshot with the fields the sanitizer reads.
pub(crate) fn battery(percent: f64, charging: f64, plug: i64, range_km: f64) -> Snapshot {
    Snapshot::builder(Channel::Battery)
        .field("batteryLevel", percent)
        .field("chargingStatus", charging)
        .field("plugStatus", plug)
        .field("batteryAutonomy", range_km)
        .build()
}

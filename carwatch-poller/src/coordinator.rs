//! Per-channel refresh state machine.
//!
//! A [`ChannelCoordinator`] owns the latest snapshot of one channel of one
//! vehicle and decides, on each tick, whether to fetch, skip, reuse the
//! previous snapshot, or stop polling for good.

use std::sync::Arc;
use std::time::Duration;

use carwatch_types::{Channel, ChannelHealth, ChannelView, Snapshot};
use parking_lot::RwLock;

use crate::cooldown::CooldownController;
use crate::error::PollError;
use crate::fetch::{FetchError, Fetcher};
use crate::gate::RateGate;

/// What a successful tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A fresh snapshot replaced the previous one.
    Updated,
    /// The vehicle is cooling down; nothing was fetched.
    CoolingDown,
    /// The upstream throttled us after earlier successes; the previous
    /// snapshot is kept and reported as current.
    Throttled,
    /// The channel is disabled; nothing was fetched.
    Disabled,
}

impl TickOutcome {
    /// True if the tick stored a new snapshot.
    pub fn is_fresh(&self) -> bool {
        matches!(self, TickOutcome::Updated)
    }
}

/// Mutable state of one coordinator.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub last_snapshot: Option<Arc<Snapshot>>,
    /// `None` once the channel is disabled.
    pub interval: Option<Duration>,
    pub failure_mode: ChannelHealth,
    /// Monotonic: never goes back to false.
    pub has_ever_succeeded: bool,
    pub last_update_success: bool,
    pub last_error: Option<String>,
}

impl ChannelState {
    fn demote(&mut self, health: ChannelHealth) {
        self.failure_mode = health;
        self.interval = None;
    }

    fn fail(&mut self, err: PollError) -> PollError {
        self.last_update_success = false;
        self.last_error = Some(err.to_string());
        err
    }
}

/// Refresh coordinator for one channel of one vehicle.
#[derive(Debug)]
pub struct ChannelCoordinator {
    channel: Channel,
    fetcher: Arc<dyn Fetcher>,
    gate: RateGate,
    cooldown: Arc<CooldownController>,
    state: RwLock<ChannelState>,
}

impl ChannelCoordinator {
    /// Create a healthy coordinator polling every `interval`.
    pub fn new(
        channel: Channel,
        interval: Duration,
        fetcher: Arc<dyn Fetcher>,
        gate: RateGate,
        cooldown: Arc<CooldownController>,
    ) -> Self {
        Self {
            channel,
            fetcher,
            gate,
            cooldown,
            state: RwLock::new(ChannelState {
                interval: Some(interval),
                ..ChannelState::default()
            }),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Latest accepted snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().last_snapshot.clone()
    }

    pub fn health(&self) -> ChannelHealth {
        self.state.read().failure_mode
    }

    /// Refresh interval, or `None` if polling has stopped.
    pub fn interval(&self) -> Option<Duration> {
        self.state.read().interval
    }

    /// Copy of the full coordinator state.
    pub fn state(&self) -> ChannelState {
        self.state.read().clone()
    }

    /// Serializable view of the channel.
    pub fn view(&self) -> ChannelView {
        let state = self.state.read();
        ChannelView {
            health: state.failure_mode,
            last_update_success: state.last_update_success,
            last_error: state.last_error.clone(),
            snapshot: state.last_snapshot.as_deref().cloned(),
        }
    }

    /// Run one refresh attempt.
    ///
    /// Returns `Ok` when the caller should treat the channel as up to date
    /// (including skips), and `Err` when the failure should be surfaced.
    pub async fn tick(&self) -> Result<TickOutcome, PollError> {
        self.tick_with(|_| {}).await
    }

    /// Like [`tick`](Self::tick), but hands the snapshot this tick accepted
    /// to `on_accept` before it is stored. Concurrent ticks call `on_accept`
    /// in fetch order.
    pub(crate) async fn tick_with(
        &self,
        on_accept: impl FnOnce(&Snapshot),
    ) -> Result<TickOutcome, PollError> {
        if self.health().is_terminal() {
            return Ok(TickOutcome::Disabled);
        }

        if self.cooldown.is_cooling() {
            tracing::warn!(channel = %self.channel, "API throttled, waiting for next scan");
            return Ok(TickOutcome::CoolingDown);
        }

        let _ticket = self.gate.acquire().await;
        if self.health().is_terminal() {
            return Ok(TickOutcome::Disabled);
        }
        // A sibling may have been throttled while we waited for the gate.
        if self.cooldown.is_cooling() {
            tracing::warn!(channel = %self.channel, "API throttled, waiting for next scan");
            return Ok(TickOutcome::CoolingDown);
        }

        // Applied under the gate: results land in fetch order.
        match self.fetcher.fetch(self.channel).await {
            Ok(snapshot) => Ok(self.accept(snapshot, on_accept)),
            Err(err) => self.classify(err),
        }
    }

    fn accept(&self, snapshot: Snapshot, on_accept: impl FnOnce(&Snapshot)) -> TickOutcome {
        let mut state = self.state.write();
        on_accept(&snapshot);
        state.last_snapshot = Some(Arc::new(snapshot));
        state.has_ever_succeeded = true;
        state.last_update_success = true;
        state.last_error = None;
        tracing::debug!(channel = %self.channel, "channel updated");
        TickOutcome::Updated
    }

    fn classify(&self, err: FetchError) -> Result<TickOutcome, PollError> {
        if matches!(err, FetchError::QuotaExceeded(_)) {
            self.cooldown.enter_cooldown();
        }

        let channel = self.channel;
        let mut state = self.state.write();
        match err {
            FetchError::AccessDenied(reason) => {
                let permanent = !state.has_ever_succeeded;
                if permanent {
                    state.demote(ChannelHealth::Denied);
                    tracing::error!(%channel, %reason, "access denied, disabling channel");
                } else {
                    tracing::warn!(%channel, %reason, "access denied after earlier success");
                }
                Err(state.fail(PollError::AccessDenied {
                    channel,
                    reason,
                    permanent,
                }))
            }
            FetchError::NotSupported(reason) => {
                state.demote(ChannelHealth::Unsupported);
                tracing::error!(%channel, %reason, "endpoint not supported, disabling channel");
                Err(state.fail(PollError::NotSupported { channel, reason }))
            }
            FetchError::QuotaExceeded(reason) => {
                if state.has_ever_succeeded {
                    tracing::warn!(%channel, %reason, "API throttled, reusing latest received data");
                    state.last_update_success = true;
                    Ok(TickOutcome::Throttled)
                } else {
                    Err(state.fail(PollError::Throttled { channel, reason }))
                }
            }
            FetchError::Remote(reason) => {
                tracing::debug!(%channel, %reason, "update failed");
                Err(state.fail(PollError::Remote { channel, reason }))
            }
        }
    }
}

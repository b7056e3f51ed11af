//! Vehicle-wide cooldown after an upstream throttle.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// How long polling pauses after a throttle response.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Raw cooldown record.
///
/// `active` implies `started_at` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    pub active: bool,
    pub started_at: Option<Instant>,
}

/// Tracks whether a vehicle is in a post-throttle cooldown window.
///
/// One controller is shared by every channel of a vehicle: a throttle seen by
/// any channel silences the next due poll of all of them. Expiry is evaluated
/// lazily when [`is_cooling`](Self::is_cooling) is called; there is no
/// background timer.
#[derive(Debug)]
pub struct CooldownController {
    duration: Duration,
    state: Mutex<CooldownState>,
}

impl CooldownController {
    /// Create a controller with a specific cooldown length.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: Mutex::new(CooldownState::default()),
        }
    }

    /// The configured cooldown length.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// True while a cooldown is active and unexpired.
    ///
    /// An expired cooldown is cleared by this call.
    pub fn is_cooling(&self) -> bool {
        let mut state = self.state.lock();
        if !state.active {
            return false;
        }

        match state.started_at {
            Some(started) if started.elapsed() < self.duration => true,
            _ => {
                *state = CooldownState::default();
                tracing::info!("API cooldown over, resuming updates");
                false
            }
        }
    }

    /// Start a new cooldown window now.
    ///
    /// Re-arms from scratch; an existing window is replaced, not extended.
    pub fn enter_cooldown(&self) {
        let mut state = self.state.lock();
        state.active = true;
        state.started_at = Some(Instant::now());
        tracing::warn!(
            cooldown_secs = self.duration.as_secs(),
            "API throttled, pausing updates"
        );
    }

    /// Time left in the current window, without clearing an expired one.
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.state.lock();
        if !state.active {
            return None;
        }
        let started = state.started_at?;
        self.duration.checked_sub(started.elapsed()).filter(|d| !d.is_zero())
    }

    /// Copy of the raw record.
    pub fn state(&self) -> CooldownState {
        *self.state.lock()
    }
}

impl Default for CooldownController {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cooling_right_after_entering() {
        let cooldown = CooldownController::default();
        assert!(!cooldown.is_cooling());

        cooldown.enter_cooldown();
        assert!(cooldown.is_cooling());
        assert_eq!(cooldown.remaining(), Some(DEFAULT_COOLDOWN));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_lazy() {
        let cooldown = CooldownController::new(Duration::from_secs(60));
        cooldown.enter_cooldown();

        tokio::time::advance(Duration::from_secs(61)).await;

        // Nothing has checked yet, the record is still armed.
        assert!(cooldown.state().active);
        assert_eq!(cooldown.remaining(), None);

        assert!(!cooldown.is_cooling());
        assert_eq!(cooldown.state(), CooldownState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn still_cooling_just_before_expiry() {
        let cooldown = CooldownController::new(Duration::from_secs(60));
        cooldown.enter_cooldown();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cooldown.is_cooling());
        assert_eq!(cooldown.remaining(), Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn re_entering_resets_the_window() {
        let cooldown = CooldownController::new(Duration::from_secs(60));
        cooldown.enter_cooldown();

        tokio::time::advance(Duration::from_secs(50)).await;
        cooldown.enter_cooldown();

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(cooldown.is_cooling());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!cooldown.is_cooling());
    }

    #[test]
    fn active_implies_started_at() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let cooldown = CooldownController::default();
            cooldown.enter_cooldown();
            let state = cooldown.state();
            assert!(state.active);
            assert!(state.started_at.is_some());
        });
    }
}

//! Single-slot gate in front of the upstream API.
//!
//! The upstream rate limit is per account, not per vehicle or endpoint, so
//! every fetch in the process goes through one shared [`RateGate`]. Create it
//! once and hand clones to every coordinator; clones share the same slot.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Bounds concurrent upstream calls to exactly one in flight.
///
/// Waiters are served in FIFO order.
///
/// # Example
///
/// ```rust
/// use carwatch_poller::RateGate;
///
/// # tokio_test::block_on(async {
/// let gate = RateGate::new();
/// let ticket = gate.acquire().await;
/// assert!(gate.is_busy());
/// RateGate::release(ticket);
/// assert!(!gate.is_busy());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateGate {
    slot: Arc<Mutex<()>>,
}

impl RateGate {
    /// Create a new, free gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the gate is free and take it.
    ///
    /// The gate is released when the returned ticket is dropped, so every
    /// exit path of the caller (including errors and panics) frees it.
    pub async fn acquire(&self) -> RateTicket {
        let guard = self.slot.clone().lock_owned().await;
        RateTicket {
            _guard: guard,
            acquired_at: Instant::now(),
        }
    }

    /// Return a ticket explicitly. Equivalent to dropping it.
    pub fn release(ticket: RateTicket) {
        drop(ticket);
    }

    /// Run a future while holding the gate.
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _ticket = self.acquire().await;
        fut.await
    }

    /// True if a caller currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }
}

/// Proof of holding the [`RateGate`].
#[derive(Debug)]
pub struct RateTicket {
    _guard: OwnedMutexGuard<()>,
    acquired_at: Instant,
}

impl RateTicket {
    /// When the gate was acquired.
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_the_slot() {
        let gate = RateGate::new();
        let other = gate.clone();

        let ticket = gate.acquire().await;
        assert!(other.is_busy());

        drop(ticket);
        assert!(!other.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_holder_under_contention() {
        let gate = RateGate::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            let completed = completed.clone();
            handles.push(tokio::spawn(async move {
                gate.run(async {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
                completed.fetch_add(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 16);
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn released_when_holder_fails() {
        let gate = RateGate::new();

        let result: Result<(), &str> = gate.run(async { Err("upstream exploded") }).await;
        assert!(result.is_err());
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn released_when_holder_panics() {
        let gate = RateGate::new();
        let task_gate = gate.clone();

        let outcome = tokio::spawn(async move {
            let _ticket = task_gate.acquire().await;
            panic!("fetch crashed");
        })
        .await;

        assert!(outcome.is_err());
        assert!(!gate.is_busy());
        let _ticket = gate.acquire().await;
    }
}

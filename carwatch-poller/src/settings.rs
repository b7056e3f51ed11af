//! Polling settings shared by every vehicle of a poller.

use std::time::Duration;

use crate::cooldown::DEFAULT_COOLDOWN;
use crate::sanitizer::DefectProfile;

/// Upstream call budget per account.
pub const DEFAULT_MAX_CALLS_PER_HOUR: u32 = 100;

/// Settings applied to every registered vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    /// Call budget the scan interval is derived from.
    pub max_calls_per_hour: u32,
    /// Pause after a throttle response.
    pub cooldown: Duration,
    /// Fixed interval, overriding the derived one.
    pub interval: Option<Duration>,
    /// Models whose battery readings are sanitized.
    pub defect_profiles: Vec<DefectProfile>,
}

impl PollSettings {
    /// Interval between two polls of one channel for a vehicle polling
    /// `channel_count` channels. A zero fixed interval is ignored.
    pub fn interval_for(&self, channel_count: usize) -> Duration {
        self.interval
            .filter(|interval| !interval.is_zero())
            .unwrap_or_else(|| scan_interval(self.max_calls_per_hour, channel_count))
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_calls_per_hour: DEFAULT_MAX_CALLS_PER_HOUR,
            cooldown: DEFAULT_COOLDOWN,
            interval: None,
            defect_profiles: vec![DefectProfile::twingo_iii()],
        }
    }
}

/// Spread `max_calls_per_hour` evenly over `channel_count` channels.
///
/// # Example
///
/// ```rust
/// use carwatch_poller::scan_interval;
/// use std::time::Duration;
///
/// assert_eq!(scan_interval(100, 7), Duration::from_secs_f64(252.0));
/// ```
pub fn scan_interval(max_calls_per_hour: u32, channel_count: usize) -> Duration {
    let calls = f64::from(max_calls_per_hour.max(1));
    let channels = channel_count.max(1) as f64;
    Duration::from_secs_f64(channels * 3600.0 / calls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_scales_with_channels() {
        assert_eq!(scan_interval(100, 1), Duration::from_secs(36));
        assert_eq!(scan_interval(100, 5), Duration::from_secs(180));
        assert_eq!(scan_interval(60, 2), Duration::from_secs(120));
    }

    #[test]
    fn degenerate_inputs_are_clamped() {
        assert_eq!(scan_interval(0, 0), Duration::from_secs(3600));
    }

    #[test]
    fn explicit_interval_wins() {
        let settings = PollSettings {
            interval: Some(Duration::from_secs(30)),
            ..PollSettings::default()
        };
        assert_eq!(settings.interval_for(7), Duration::from_secs(30));
    }

    #[test]
    fn zero_interval_is_ignored() {
        let settings = PollSettings {
            interval: Some(Duration::ZERO),
            ..PollSettings::default()
        };
        assert_eq!(settings.interval_for(7), Duration::from_secs(252));
    }

    #[test]
    fn defaults() {
        let settings = PollSettings::default();
        assert_eq!(settings.max_calls_per_hour, 100);
        assert_eq!(settings.cooldown, Duration::from_secs(900));
        assert_eq!(settings.defect_profiles, vec![DefectProfile::twingo_iii()]);
    }
}

use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse duration strings like "15m", "4.2m", "90s", "500ms", "1h"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration must be a non-negative number: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Format a duration for logs
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        "0s".to_string()
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else if d.as_secs() < 60 {
        format!("{:.2}s", d.as_secs_f64())
    } else if d.as_secs() < 3600 {
        format!("{:.1}m", d.as_secs_f64() / 60.0)
    } else {
        format!("{:.1}h", d.as_secs_f64() / 3600.0)
    }
}

//! Snapshot - the immutable result of one successful fetch.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::{Channel, ChargeState, FieldValue, PlugState};

/// The result of one successful fetch for a channel.
///
/// Snapshots are immutable once built. A newer snapshot for the same channel
/// supersedes the previous one entirely; fields are never merged across
/// fetches.
///
/// # Example
///
/// ```rust
/// use carwatch_types::{Channel, Snapshot};
///
/// let snapshot = Snapshot::builder(Channel::Lock)
///     .field("lockStatus", "locked")
///     .field("hatchStatus", "closed")
///     .build();
///
/// assert_eq!(snapshot.get_str("lockStatus"), Some("locked"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Channel this snapshot was fetched for.
    pub channel: Channel,

    /// Unix timestamp in milliseconds when the snapshot was accepted.
    pub timestamp_ms: u64,

    /// Attribute values keyed by upstream field name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Snapshot {
    /// Create an empty snapshot with the current timestamp.
    #[cfg(feature = "std")]
    pub fn new(channel: Channel) -> Self {
        Self::with_timestamp(channel, current_timestamp_ms())
    }

    /// Create an empty snapshot with a specific timestamp.
    pub fn with_timestamp(channel: Channel, timestamp_ms: u64) -> Self {
        Self {
            channel,
            timestamp_ms,
            fields: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder(channel: Channel) -> SnapshotBuilder {
        SnapshotBuilder::new(channel)
    }

    /// Check if the snapshot carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields in the snapshot.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Get a numeric field.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_f64)
    }

    /// Get a text field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Decoded `chargingStatus`, if present and known.
    pub fn charge_state(&self) -> Option<ChargeState> {
        self.get_f64("chargingStatus").and_then(ChargeState::from_code)
    }

    /// Decoded `plugStatus`, if present, integral and known.
    pub fn plug_state(&self) -> Option<PlugState> {
        self.get_f64("plugStatus")
            .filter(|code| (*code as i64) as f64 == *code)
            .and_then(|code| PlugState::from_code(code as i64))
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug)]
pub struct SnapshotBuilder {
    channel: Channel,
    timestamp_ms: Option<u64>,
    fields: BTreeMap<String, FieldValue>,
}

impl SnapshotBuilder {
    /// Create a new builder for a channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            timestamp_ms: None,
            fields: BTreeMap::new(),
        }
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field only when a value is present.
    pub fn maybe_field(self, key: impl Into<String>, value: Option<impl Into<FieldValue>>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Build the snapshot.
    #[cfg(feature = "std")]
    pub fn build(self) -> Snapshot {
        Snapshot {
            channel: self.channel,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            fields: self.fields,
        }
    }

    /// Build the snapshot with a specific timestamp (for no_std).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> Snapshot {
        Snapshot {
            channel: self.channel,
            timestamp_ms: self.timestamp_ms.unwrap_or(0),
            fields: self.fields,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

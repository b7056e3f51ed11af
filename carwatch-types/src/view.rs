//! Serializable views of the read model.
//!
//! These are what gets exported to files or channels; they are assembled by
//! the poller from the live coordinator state.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::{Channel, ChannelHealth, FieldValue, SchemaVersion, Snapshot};

/// Read-model view of every registered vehicle.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FleetView {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds when the view was assembled.
    pub timestamp_ms: u64,

    /// Per-vehicle views keyed by VIN.
    pub vehicles: BTreeMap<String, VehicleView>,
}

impl FleetView {
    /// Number of vehicles in the view.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Check if the view holds no vehicles.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Get the view for one vehicle.
    pub fn get(&self, vin: &str) -> Option<&VehicleView> {
        self.vehicles.get(vin)
    }
}

/// Read-model view of one vehicle.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleView {
    /// Vehicle model identifier (e.g. "X071VE").
    pub model_id: String,

    /// State of every polled channel.
    pub channels: BTreeMap<Channel, ChannelView>,

    /// Derived sensor values keyed by sensor key. Sensors without a value are omitted.
    pub sensors: BTreeMap<String, FieldValue>,

    /// Binary sensor states keyed by sensor key. Unknown states are omitted.
    pub binary_sensors: BTreeMap<String, bool>,
}

/// Read-model view of one channel.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelView {
    pub health: ChannelHealth,

    /// False after a surfaced failure, true after a success or a soft skip.
    pub last_update_success: bool,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_error: Option<String>,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub snapshot: Option<Snapshot>,
}

//! Registry of every vehicle known to a poller.

use std::collections::BTreeMap;
use std::sync::Arc;

use carwatch_types::{current_timestamp_ms, FleetView, SchemaVersion};
use parking_lot::RwLock;

use crate::vehicle::VehicleState;

/// All registered vehicles, keyed by VIN.
#[derive(Debug, Default)]
pub struct FleetState {
    vehicles: RwLock<BTreeMap<String, Arc<VehicleState>>>,
}

impl FleetState {
    /// Register a vehicle, or return the one already registered under its VIN.
    ///
    /// `create` only runs when the VIN is new.
    pub fn register_with(
        &self,
        vin: &str,
        create: impl FnOnce() -> VehicleState,
    ) -> Arc<VehicleState> {
        // Fast path
        {
            let vehicles = self.vehicles.read();
            if let Some(state) = vehicles.get(vin) {
                return state.clone();
            }
        }

        // Slow path, re-checked under the write lock
        let mut vehicles = self.vehicles.write();
        vehicles
            .entry(vin.to_string())
            .or_insert_with(|| Arc::new(create()))
            .clone()
    }

    /// Remove a vehicle. Returns `true` if it was registered.
    pub fn unregister(&self, vin: &str) -> bool {
        self.vehicles.write().remove(vin).is_some()
    }

    pub fn get(&self, vin: &str) -> Option<Arc<VehicleState>> {
        self.vehicles.read().get(vin).cloned()
    }

    /// Every registered vehicle, in VIN order.
    pub fn vehicles(&self) -> Vec<Arc<VehicleState>> {
        self.vehicles.read().values().cloned().collect()
    }

    /// Assemble the read model of every vehicle.
    pub fn collect(&self) -> FleetView {
        let vehicles = self
            .vehicles
            .read()
            .iter()
            .map(|(vin, state)| (vin.clone(), state.view()))
            .collect();

        FleetView {
            version: SchemaVersion::current(),
            timestamp_ms: current_timestamp_ms(),
            vehicles,
        }
    }
}

//! Layout version of the exported read model.

use core::fmt;

use crate::SCHEMA_VERSION;

/// Layout version stamped on every [`FleetView`](crate::FleetView).
///
/// A single number, bumped whenever a field of the export is renamed,
/// removed or changes meaning. Adding fields does not bump it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SchemaVersion(pub u32);

impl SchemaVersion {
    /// The layout this crate writes.
    pub const fn current() -> Self {
        SchemaVersion(SCHEMA_VERSION)
    }

    /// True if this crate can read an export stamped with `self`.
    pub fn is_readable(&self) -> bool {
        (1..=SCHEMA_VERSION).contains(&self.0)
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

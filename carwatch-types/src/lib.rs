//! # carwatch-types
//!
//! Core types for connected-vehicle telemetry polling. This crate defines the
//! data that flows between the fetch collaborators, the polling core and the
//! consumers of the read model.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON export
//! - **Closed vocabularies**: Channels, charge and plug states are enums, not strings
//! - **Ergonomic builders**: Fluent API for constructing snapshots
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: Serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use carwatch_types::{Channel, ChargeState, Snapshot};
//!
//! let snapshot = Snapshot::builder(Channel::Battery)
//!     .field("batteryLevel", 87)
//!     .field("batteryAutonomy", 152)
//!     .field("chargingStatus", 1.0)
//!     .build();
//!
//! assert_eq!(snapshot.get_f64("batteryLevel"), Some(87.0));
//! assert_eq!(snapshot.charge_state(), Some(ChargeState::ChargeInProgress));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod health;
mod snapshot;
mod status;
mod value;
mod version;
mod view;

pub use channel::*;
pub use health::*;
pub use snapshot::*;
pub use status::*;
pub use value::*;
pub use version::*;
pub use view::*;

/// Current read-model schema version.
///
/// Increment this when making breaking changes to the exported view format.
pub const SCHEMA_VERSION: u32 = 1;

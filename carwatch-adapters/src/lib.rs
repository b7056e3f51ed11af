//! # carwatch-adapters
//!
//! Ready-made [`Fetcher`](carwatch_poller::Fetcher) implementations for
//! carwatch.
//!
//! ## Supported Sources
//!
//! - **Replay** (always available) - Serves recorded API responses from a
//!   directory of JSON files
//! - **HTTP** (`http` feature) - Queries a live Kamereon-style car adapter API
//!
//! Both understand the same response bodies and classify API error codes
//! into the fetch error taxonomy the poller acts on.
//!
//! ## Quick Start (Replay)
//!
//! ```rust,no_run
//! use carwatch_adapters::ReplayFetcher;
//! use carwatch_poller::{Poller, VehicleSpec};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let poller = Poller::new();
//!     let car = poller.register(
//!         VehicleSpec::new("VF1AAAAA555777999", "X071VE"),
//!         Arc::new(ReplayFetcher::new("recordings/zoe")),
//!     );
//!
//!     poller.first_refresh().await;
//!     println!("{:?}", car.sensor("battery_level"));
//! }
//! ```

pub mod error;
pub mod kamereon;
pub mod replay;

#[cfg(feature = "http")]
pub mod http;

pub use error::AdapterError;
pub use replay::ReplayFetcher;

#[cfg(feature = "http")]
pub use http::{HttpFetcher, HttpFetcherBuilder};

//! # carwatch
//!
//! Host binary and library for polling connected-vehicle telemetry.
//!
//! The polling machinery lives in [`carwatch_poller`]; this crate turns a
//! configuration file into a running [`Poller`](carwatch_poller::Poller):
//!
//! ```text
//!  carwatch.toml ──▶ config ──▶ source ──▶ app ──▶ Poller ──▶ fleet.json
//!   + CARWATCH_*     (Settings)  (Fetcher)   (register,
//!                                            first refresh, start)
//! ```
//!
//! - **[`config`]**: settings from TOML and the environment
//! - **[`source`]**: builds a fetcher per vehicle (replay or http)
//! - **[`app`]**: registers vehicles and runs the poller
//! - **[`duration`]**: duration strings such as `"15m"` or `"500ms"`
//!
//! ## Usage
//!
//! ```bash
//! # Poll until ctrl-c, exporting to the configured path
//! carwatch --config carwatch.toml
//!
//! # One refresh of every channel, printed as JSON
//! carwatch --config carwatch.toml --once
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::path::Path;
//!
//! # tokio_test::block_on(async {
//! let app = carwatch::app::from_config_file(Path::new("carwatch.toml"), None).unwrap();
//! let view = app.run_once().await;
//! println!("{} vehicles", view.len());
//! # });
//! ```

pub mod app;
pub mod config;
pub mod duration;
pub mod source;

pub use app::App;
pub use config::{Settings, SourceConfig, VehicleEntry};

#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core tank level control (hardware-agnostic).
//!
//! All hardware and network interactions go through the `tank_traits` seams:
//! `EchoSensor`, `Relay`, `RemoteStore` and `StatusPresenter`.
//!
//! ## Pipeline
//!
//! - **Ranging**: echo pulse width to centimeters (`ranging`)
//! - **Filtering**: fixed-window moving average (`filter`)
//! - **Mapping**: distance to fill percentage under a calibration (`level`)
//! - **Control**: two-state pump machine with start dwell and remote-stop hold (`pump`)
//! - **Sync**: snapshot publication and inbound overrides (`sync`, `inbox`)
//! - **Cycle**: one tick ties it together (`controller`), `runner` loops it
//!
//! Levels are sensor-to-surface distances: a smaller level is a fuller tank.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod inbox;
pub mod level;
pub mod persist;
pub mod pump;
pub mod ranging;
pub mod runner;
pub mod status;
pub mod sync;
pub mod util;

pub use builder::{Missing, Set, Settings, Tank, TankBuilder, build_controller};
pub use config::{ControlCfg, FilterCfg, RemoteCfg, Timeouts};
pub use controller::TankController;
pub use error::{BuildError, Report, Result, TankError};
pub use filter::MovingAverage;
pub use inbox::{OverrideInbox, Pending, RemoteOverride};
pub use level::{Calibration, percent};
pub use pump::{PumpMachine, PumpState, Transition};
pub use ranging::{RangeSampler, echo_to_cm};
pub use runner::{RunSummary, run};
pub use status::CycleReport;
pub use sync::{PublishReport, Snapshot, SyncBridge};

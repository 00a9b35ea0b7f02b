//! Per-cycle report returned by the controller.

use crate::error::TankError;
use crate::pump::{PumpState, Transition};
use crate::sync::PublishReport;

/// What happened during one control cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Distance from this cycle's ranging, before smoothing.
    pub raw: Option<i32>,
    /// Smoothed level; `None` when the ranging failed.
    pub level: Option<i32>,
    pub percent: Option<u8>,
    /// Pump state at the end of the cycle.
    pub pump: PumpState,
    /// Outcome of the fill decision, or `Stopped` when a remote or watchdog stop
    /// switched the relay off this cycle.
    pub transition: Transition,
    /// An inbound remote stop was applied this cycle.
    pub remote_stop: bool,
    pub calibration_changed: bool,
    /// Inbound calibration overrides refused this cycle.
    pub overrides_rejected: u32,
    pub sample_error: Option<TankError>,
    /// The missed-echo watchdog forced the pump off.
    pub watchdog_stop: bool,
    /// Snapshot publication; `None` when nothing was published.
    pub publish: Option<PublishReport>,
}

impl CycleReport {
    pub(crate) fn new(pump: PumpState) -> Self {
        Self {
            raw: None,
            level: None,
            percent: None,
            pump,
            transition: Transition::Unchanged,
            remote_stop: false,
            calibration_changed: false,
            overrides_rejected: 0,
            sample_error: None,
            watchdog_stop: false,
            publish: None,
        }
    }
}

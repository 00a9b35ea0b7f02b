//! Runtime configuration for the tank controller.
//!
//! These are separate from the TOML-deserialized config in `tank_config`;
//! `conversions` maps one onto the other.

use std::time::Duration;

/// Smoothing stage.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Moving average window in samples. 1 disables smoothing.
    pub window: usize,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self { window: 5 }
    }
}

/// Cycle timing and pump decision parameters.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Period of the control cycle (ms).
    pub cycle_ms: u64,
    /// After the pump starts no transition is taken for this long (ms).
    pub dwell_ms: u64,
    /// The pump starts only while the fill percentage is below this value.
    pub start_below_percent: u8,
    /// Restart inhibit after a remote stop (ms).
    pub override_hold_ms: u64,
    /// Consecutive echo misses while pumping before the pump is forced off. 0 disables.
    pub max_echo_misses: u32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            cycle_ms: 100,
            dwell_ms: 3000,
            start_below_percent: 100,
            override_hold_ms: 3000,
            max_echo_misses: 10,
        }
    }
}

impl ControlCfg {
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
    pub fn override_hold(&self) -> Duration {
        Duration::from_millis(self.override_hold_ms)
    }
}

/// Timeouts for blocking I/O.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Max wait for one echo pulse (ms).
    pub echo_ms: u64,
    /// Max wait for one remote write (ms).
    pub remote_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            echo_ms: 30,
            remote_ms: 5000,
        }
    }
}

/// Remote store layout.
#[derive(Debug, Clone)]
pub struct RemoteCfg {
    /// Base path all synchronized children live under.
    pub base_path: String,
}

impl Default for RemoteCfg {
    fn default() -> Self {
        Self {
            base_path: "/Test".into(),
        }
    }
}

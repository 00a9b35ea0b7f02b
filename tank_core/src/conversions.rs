//! `From`/`TryFrom` implementations bridging `tank_config` types to `tank_core` types.

use tank_config::PersistedCalibration;

use crate::config::{ControlCfg, FilterCfg, RemoteCfg, Timeouts};
use crate::error::TankError;
use crate::level::Calibration;

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<&tank_config::FilterCfg> for FilterCfg {
    fn from(c: &tank_config::FilterCfg) -> Self {
        Self { window: c.window }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&tank_config::ControlCfg> for ControlCfg {
    fn from(c: &tank_config::ControlCfg) -> Self {
        Self {
            cycle_ms: c.cycle_ms,
            dwell_ms: c.dwell_ms,
            start_below_percent: c.start_below_percent,
            override_hold_ms: c.override_hold_ms,
            max_echo_misses: c.max_echo_misses,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&tank_config::Timeouts> for Timeouts {
    fn from(c: &tank_config::Timeouts) -> Self {
        Self {
            echo_ms: c.echo_ms,
            remote_ms: c.remote_ms,
        }
    }
}

// ── RemoteCfg ────────────────────────────────────────────────────────────────

impl From<&tank_config::RemoteCfg> for RemoteCfg {
    fn from(c: &tank_config::RemoteCfg) -> Self {
        Self {
            base_path: c.base_path.clone(),
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&tank_config::CalibrationCfg> for Calibration {
    type Error = TankError;
    fn try_from(c: &tank_config::CalibrationCfg) -> Result<Self, Self::Error> {
        Self::new(c.empty_level, c.full_level).map_err(|e| TankError::Config(e.to_string()))
    }
}

impl TryFrom<PersistedCalibration> for Calibration {
    type Error = TankError;
    fn try_from(p: PersistedCalibration) -> Result<Self, Self::Error> {
        Self::new(p.empty_level, p.full_level).map_err(|e| TankError::Config(e.to_string()))
    }
}

impl From<Calibration> for PersistedCalibration {
    fn from(c: Calibration) -> Self {
        Self {
            empty_level: c.empty_level(),
            full_level: c.full_level(),
        }
    }
}

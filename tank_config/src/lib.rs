#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the tank controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - `PersistedCalibration` is the on-disk form of a remotely overridden calibration.
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Upper bound for any level in centimeters, shared by config and remote overrides.
pub const MAX_LEVEL_CM: i32 = 10_000;

/// BCM pin numbers.
#[derive(Debug, Deserialize)]
pub struct Pins {
    pub trigger: u8,
    pub echo: u8,
    pub relay: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Moving-average window in samples.
    pub window: usize,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self { window: 5 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Control cycle period.
    pub cycle_ms: u64,
    /// Lockout after the pump starts, during which no transition is taken.
    pub dwell_ms: u64,
    /// Pump only starts while the fill percentage is below this value.
    pub start_below_percent: u8,
    /// After a remote stop, automatic restart is held off for this long.
    pub override_hold_ms: u64,
    /// Consecutive echo misses tolerated while pumping (0 disables the watchdog)
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Sensor-to-surface distance (cm) of an empty tank.
    pub empty_level: i32,
    /// Sensor-to-surface distance (cm) of a full tank.
    pub full_level: i32,
    /// When set, accepted remote overrides are persisted here and preferred at start-up.
    pub persist_file: Option<String>,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            empty_level: 78,
            full_level: 7,
            persist_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Maximum wait for the echo pulse of one ranging.
    pub echo_ms: u64,
    /// Per-write timeout towards the remote store.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteCfg {
    pub base_path: String,
}

impl Default for RemoteCfg {
    fn default() -> Self {
        Self {
            base_path: "/Test".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayCfg {
    /// Relay board pulls in on a low input
    pub active_low: bool,
}

impl Default for RelayCfg {
    fn default() -> Self {
        Self { active_low: true }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub remote: RemoteCfg,
    #[serde(default)]
    pub relay: RelayCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Calibration written back to disk after an accepted remote override.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PersistedCalibration {
    pub empty_level: i32,
    pub full_level: i32,
}

impl PersistedCalibration {
    pub fn to_toml(&self) -> eyre::Result<String> {
        toml::to_string(self).map_err(|e| eyre::eyre!("serialize calibration: {e}"))
    }

    pub fn from_toml(s: &str) -> eyre::Result<Self> {
        let cal: Self =
            toml::from_str(s).map_err(|e| eyre::eyre!("parse persisted calibration: {e}"))?;
        validate_levels(cal.empty_level, cal.full_level)?;
        Ok(cal)
    }

    /// Load from `path`. A missing file is not an error and yields `None`.
    pub fn load(path: &Path) -> eyre::Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml(&s).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => eyre::bail!("read persisted calibration {}: {e}", path.display()),
        }
    }
}

/// Both levels within `0..=MAX_LEVEL_CM` and the empty distance strictly beyond the full one.
pub fn validate_levels(empty_level: i32, full_level: i32) -> eyre::Result<()> {
    if !(0..=MAX_LEVEL_CM).contains(&empty_level) {
        eyre::bail!("calibration.empty_level must be in [0, {MAX_LEVEL_CM}], got {empty_level}");
    }
    if !(0..=MAX_LEVEL_CM).contains(&full_level) {
        eyre::bail!("calibration.full_level must be in [0, {MAX_LEVEL_CM}], got {full_level}");
    }
    if empty_level <= full_level {
        eyre::bail!(
            "calibration.empty_level ({empty_level}) must be greater than calibration.full_level ({full_level})"
        );
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        if p.trigger == p.echo || p.trigger == p.relay || p.echo == p.relay {
            eyre::bail!("pins.trigger, pins.echo and pins.relay must be distinct");
        }

        // Filter
        if self.filter.window == 0 || self.filter.window > 64 {
            eyre::bail!("filter.window must be in [1, 64]");
        }

        // Control
        if self.control.cycle_ms == 0 {
            eyre::bail!("control.cycle_ms must be >= 1");
        }
        if self.control.cycle_ms > 60 * 1000 {
            eyre::bail!("control.cycle_ms is unreasonably large (>1min)");
        }
        if self.control.dwell_ms > 10 * 60 * 1000 {
            eyre::bail!("control.dwell_ms is unreasonably large (>10min)");
        }
        if self.control.start_below_percent == 0 || self.control.start_below_percent > 100 {
            eyre::bail!("control.start_below_percent must be in [1, 100]");
        }
        if self.control.override_hold_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("control.override_hold_ms is unreasonably large (>24h)");
        }

        // Calibration
        validate_levels(self.calibration.empty_level, self.calibration.full_level)?;
        if let Some(f) = &self.calibration.persist_file
            && f.trim().is_empty()
        {
            eyre::bail!("calibration.persist_file must not be empty when set");
        }

        // Timeouts
        if self.timeouts.echo_ms == 0 {
            eyre::bail!("timeouts.echo_ms must be >= 1");
        }
        if self.timeouts.echo_ms > 1000 {
            eyre::bail!("timeouts.echo_ms is unreasonably large (>1s)");
        }
        if self.timeouts.remote_ms == 0 {
            eyre::bail!("timeouts.remote_ms must be >= 1");
        }

        // Remote
        let base = &self.remote.base_path;
        if !base.starts_with('/') || (base.len() > 1 && base.ends_with('/')) {
            eyre::bail!("remote.base_path must start with '/' and not end with '/', got {base:?}");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        Ok(())
    }
}

//! Tank calibration and the distance-to-percent mapping.
//!
//! Levels are sensor-to-surface distances in centimeters, so a smaller level means a
//! fuller tank: `full_level < empty_level`.

use tank_config::MAX_LEVEL_CM;

use crate::error::TankError;

/// Empty and full distances of the tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    empty_level: i32,
    full_level: i32,
}

impl Calibration {
    /// Both levels within `0..=10_000` cm and `empty_level > full_level`.
    pub fn new(empty_level: i32, full_level: i32) -> Result<Self, TankError> {
        if !(0..=MAX_LEVEL_CM).contains(&empty_level) {
            return Err(TankError::InvalidOverride(format!(
                "empty level {empty_level} outside 0..={MAX_LEVEL_CM}"
            )));
        }
        if !(0..=MAX_LEVEL_CM).contains(&full_level) {
            return Err(TankError::InvalidOverride(format!(
                "full level {full_level} outside 0..={MAX_LEVEL_CM}"
            )));
        }
        if empty_level <= full_level {
            return Err(TankError::InvalidOverride(format!(
                "empty level {empty_level} must exceed full level {full_level}"
            )));
        }
        Ok(Self {
            empty_level,
            full_level,
        })
    }

    pub fn empty_level(&self) -> i32 {
        self.empty_level
    }

    pub fn full_level(&self) -> i32 {
        self.full_level
    }

    /// Usable height between the empty and the full mark. Always positive.
    pub fn max_height(&self) -> i32 {
        self.empty_level - self.full_level
    }

    /// Same calibration with a new empty level, re-validated.
    pub fn with_empty(self, empty_level: i32) -> Result<Self, TankError> {
        Self::new(empty_level, self.full_level)
    }

    /// Same calibration with a new full level, re-validated.
    pub fn with_full(self, full_level: i32) -> Result<Self, TankError> {
        Self::new(self.empty_level, full_level)
    }

    pub fn percent(&self, level: i32) -> u8 {
        percent(level, self)
    }

    /// The surface is still below the full mark.
    pub fn needs_fill(&self, level: i32) -> bool {
        level > self.full_level
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            empty_level: 78,
            full_level: 7,
        }
    }
}

/// Fill percentage for a smoothed level: `(empty - level) * 100 / (empty - full)`,
/// truncated and clamped to `0..=100`.
pub fn percent(level: i32, cal: &Calibration) -> u8 {
    let num = (i64::from(cal.empty_level) - i64::from(level)) * 100;
    let pct = num / i64::from(cal.max_height());
    // clamped to 0..=100 above
    pct.clamp(0, 100) as u8
}

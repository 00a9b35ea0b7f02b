//! Echo pulse width to distance.

use std::time::Duration;

use tank_traits::EchoSensor;

use crate::error::TankError;
use crate::hw_error::map_hw_error;

/// Distance in cm for an echo pulse width: `us * 0.034 / 2`, computed as `us * 17 / 1000`
/// and truncated.
pub fn echo_to_cm(echo: Duration) -> i32 {
    let us = echo.as_micros();
    i32::try_from(us.saturating_mul(17) / 1000).unwrap_or(i32::MAX)
}

/// One ranging per call, no retries.
pub struct RangeSampler<S: EchoSensor> {
    sensor: S,
    timeout: Duration,
}

impl<S: EchoSensor> RangeSampler<S> {
    pub fn new(sensor: S, timeout: Duration) -> Self {
        Self { sensor, timeout }
    }

    /// Range once. A missing echo is `TankError::NoEcho`, never a zero distance.
    pub fn sample(&mut self) -> Result<i32, TankError> {
        let echo = self
            .sensor
            .echo(self.timeout)
            .map_err(|e| map_hw_error(&*e))?;
        Ok(echo_to_cm(echo))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

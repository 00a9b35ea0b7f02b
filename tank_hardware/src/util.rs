use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `is_high` reports `level`, or until `deadline` passes.
///
/// Returns the instant the level was observed. A zero `poll_interval` busy-spins, which is
/// what echo timing needs (a 1 cm error is ~58 µs of echo).
pub fn wait_for_level(
    mut is_high: impl FnMut() -> bool,
    level: bool,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<Instant> {
    loop {
        if is_high() == level {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Measure the width of the next high pulse on an echo line.
///
/// Both edges share one `timeout` budget. A line that never rises maps to
/// `HwError::EchoTimeout`; one that rises but never falls maps to `HwError::EchoStuck`.
pub fn measure_pulse_width(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let deadline = Instant::now() + timeout;
    let rise = wait_for_level(&mut is_high, true, deadline, poll_interval)?;
    let fall = match wait_for_level(&mut is_high, false, deadline, poll_interval) {
        Ok(t) => t,
        Err(HwError::EchoTimeout) => return Err(HwError::EchoStuck),
        Err(e) => return Err(e),
    };
    Ok(fall.saturating_duration_since(rise))
}

/// Busy-wait for short trigger timings where `thread::sleep` granularity is too coarse.
#[inline]
pub fn spin_delay(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}

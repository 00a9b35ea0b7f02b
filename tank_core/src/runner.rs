use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tank_traits::{EchoSensor, Relay, RemoteStore};

use crate::controller::TankController;
use crate::error::Result as CoreResult;
use crate::pump::{PumpState, Transition};
use crate::status::CycleReport;

/// Totals over a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub starts: u64,
    pub stops: u64,
    pub remote_stops: u64,
    pub echo_misses: u64,
    pub publish_failures: u64,
    pub overrides_rejected: u64,
    pub final_state: PumpState,
    pub last_level: Option<i32>,
    pub last_percent: Option<u8>,
}

impl RunSummary {
    fn record(&mut self, r: &CycleReport) {
        self.cycles += 1;
        match r.transition {
            Transition::Started => self.starts += 1,
            Transition::Stopped => self.stops += 1,
            _ => {}
        }
        if r.remote_stop {
            self.remote_stops += 1;
        }
        if r.sample_error.is_some() {
            self.echo_misses += 1;
        }
        if let Some(p) = &r.publish {
            self.publish_failures += p.failed.len() as u64;
        }
        self.overrides_rejected += u64::from(r.overrides_rejected);
    }
}

/// Slice a delay into steps no longer than `step` so a shutdown request is seen promptly.
#[inline]
fn sleep_slices(total: Duration, step: Duration) -> impl Iterator<Item = Duration> {
    let step = step.max(Duration::from_millis(1));
    let mut left = total;
    std::iter::from_fn(move || {
        if left.is_zero() {
            return None;
        }
        let d = left.min(step);
        left -= d;
        Some(d)
    })
}

/// Run the control cycle until `shutdown` is set or `max_cycles` cycles have run, then
/// drive the pump off.
///
/// A relay failure ends the run with an error after a best-effort stop.
pub fn run<S, R, St>(
    ctl: &mut TankController<S, R, St>,
    shutdown: &AtomicBool,
    max_cycles: Option<u64>,
) -> CoreResult<RunSummary>
where
    S: EchoSensor,
    R: Relay,
    St: RemoteStore,
{
    let mut summary = RunSummary::default();
    ctl.start()?;
    tracing::info!(max_cycles = ?max_cycles, "run start");

    let clock = ctl.clock();
    let step = ctl.control.cycle();
    while !shutdown.load(Ordering::Relaxed) {
        match ctl.tick() {
            Ok(report) => summary.record(&report),
            Err(e) => {
                if let Err(stop_err) = ctl.stop() {
                    tracing::warn!(error = %stop_err, "pump stop after failure also failed");
                }
                tracing::error!(error = %e, "control cycle failed");
                return Err(e);
            }
        }
        if max_cycles.is_some_and(|n| summary.cycles >= n) {
            break;
        }
        // a remote stop cuts the wait short, dwell lockout included
        for d in sleep_slices(ctl.next_delay(), step) {
            if shutdown.load(Ordering::Relaxed) || ctl.stop_pending() {
                break;
            }
            clock.sleep(d);
        }
    }

    ctl.stop()?;
    summary.final_state = ctl.pump_state();
    summary.last_level = ctl.last_level();
    summary.last_percent = ctl.last_percent();
    tracing::info!(
        cycles = summary.cycles,
        starts = summary.starts,
        stops = summary.stops,
        "run complete"
    );
    Ok(summary)
}

//! The control cycle (`TankController`).
//!
//! One `tick` drains pending remote overrides, ranges once, smooths, maps to a
//! percentage, decides the pump state, actuates, renders and publishes a snapshot.
//! Nothing in a tick is fatal except a relay that refuses to switch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use tank_traits::{Clock, EchoSensor, Relay, RemoteStore, StatusPresenter};

use crate::config::ControlCfg;
use crate::error::{Result, TankError};
use crate::filter::MovingAverage;
use crate::inbox::OverrideInbox;
use crate::level::Calibration;
use crate::persist::save_calibration;
use crate::pump::{PumpMachine, PumpState, Transition};
use crate::ranging::RangeSampler;
use crate::status::CycleReport;
use crate::sync::{Snapshot, SyncBridge};

/// Delay before the next cycle: the cycle period, stretched to cover a dwell lockout.
#[inline]
pub fn cycle_delay(cycle: Duration, lockout_remaining: Duration) -> Duration {
    cycle.max(lockout_remaining)
}

pub struct TankController<S: EchoSensor, R: Relay, St: RemoteStore> {
    pub(crate) sampler: RangeSampler<S>,
    pub(crate) filter: MovingAverage,
    pub(crate) pump: PumpMachine<R>,
    pub(crate) bridge: SyncBridge<St>,
    pub(crate) inbox: OverrideInbox,
    pub(crate) calibration: Calibration,
    pub(crate) control: ControlCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) presenter: Option<Box<dyn StatusPresenter + Send>>,
    pub(crate) persist_file: Option<PathBuf>,

    pub(crate) started: bool,
    pub(crate) echo_misses: u32,
    pub(crate) last_level: Option<i32>,
    pub(crate) last_percent: Option<u8>,
}

impl<S: EchoSensor, R: Relay, St: RemoteStore> core::fmt::Debug for TankController<S, R, St> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TankController")
            .field("calibration", &self.calibration)
            .field("pump", &self.pump.state())
            .field("last_level", &self.last_level)
            .field("last_percent", &self.last_percent)
            .field("echo_misses", &self.echo_misses)
            .finish_non_exhaustive()
    }
}

impl<S: EchoSensor, R: Relay, St: RemoteStore> TankController<S, R, St> {
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn pump_state(&self) -> PumpState {
        self.pump.state()
    }

    pub fn last_level(&self) -> Option<i32> {
        self.last_level
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }

    pub fn echo_misses(&self) -> u32 {
        self.echo_misses
    }

    pub fn stream_timeouts(&self) -> u64 {
        self.bridge.stream_timeouts()
    }

    /// Producer handle for feeding overrides from outside the remote stream.
    pub fn inbox(&self) -> OverrideInbox {
        self.inbox.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// A remote stop arrived and the next `tick` should run without waiting out the delay.
    pub fn stop_pending(&self) -> bool {
        self.inbox.stop_pending()
    }

    /// Delay the caller should wait before the next `tick`.
    pub fn next_delay(&self) -> Duration {
        cycle_delay(
            self.control.cycle(),
            self.pump.lockout_remaining(self.clock.now()),
        )
    }

    /// Drive the relay to `Off`, start the remote stream and publish the initial mirror.
    ///
    /// Only a relay failure is an error; remote failures are logged. A second call is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.pump
            .init()
            .wrap_err("de-energize pump relay at start-up")?;
        if let Err(e) = self.bridge.subscribe(self.inbox.clone()) {
            tracing::warn!(error = %e, "remote stream unavailable; continuing without overrides");
        }
        let _ = self.bridge.publish_calibration(&self.calibration);
        let _ = self.bridge.publish_motor(PumpState::Off);
        self.started = true;
        tracing::info!(
            empty_level = self.calibration.empty_level(),
            full_level = self.calibration.full_level(),
            base = self.bridge.base_path(),
            "controller started"
        );
        Ok(())
    }

    /// One control cycle. Calls `start` first if it has not run yet.
    pub fn tick(&mut self) -> Result<CycleReport> {
        if !self.started {
            self.start()?;
        }
        let now = self.clock.now();
        let mut report = CycleReport::new(self.pump.state());

        self.apply_overrides(now, &mut report)?;

        match self.sampler.sample() {
            Ok(raw) => {
                self.echo_misses = 0;
                let level = self.filter.push(raw);
                let percent = self.calibration.percent(level);
                self.last_level = Some(level);
                self.last_percent = Some(percent);
                report.raw = Some(raw);
                report.level = Some(level);
                report.percent = Some(percent);

                let want = self.decide(level, percent);
                let t = self
                    .pump
                    .request(want, now)
                    .wrap_err("switch pump relay")?;
                if t.changed() {
                    tracing::info!(level, percent, pump = %self.pump.state(), "pump transition");
                    let _ = self.bridge.publish_motor(self.pump.state());
                }
                // keep a remote stop taken earlier in this cycle unless the relay moved again
                if t.changed() || !report.transition.changed() {
                    report.transition = t;
                }

                if let Some(p) = self.presenter.as_mut() {
                    p.render(percent);
                }
                report.publish = Some(self.bridge.publish(&Snapshot {
                    level,
                    percent,
                    pump: self.pump.state(),
                }));
            }
            Err(e) => self.on_sample_error(now, e, &mut report)?,
        }

        report.pump = self.pump.state();
        tracing::debug!(
            raw = ?report.raw,
            level = ?report.level,
            percent = ?report.percent,
            pump = %report.pump,
            transition = ?report.transition,
            "cycle"
        );
        Ok(report)
    }

    /// Force the pump off for shutdown and mirror it remotely (best-effort).
    pub fn stop(&mut self) -> Result<()> {
        let now = self.clock.now();
        let t = self
            .pump
            .force_off(now, Duration::ZERO)
            .wrap_err("stop pump on shutdown")?;
        let _ = self.bridge.publish_motor(PumpState::Off);
        tracing::info!(stopped = t.changed(), "controller stopped");
        Ok(())
    }

    fn decide(&self, level: i32, percent: u8) -> PumpState {
        let needs_fill = self.calibration.needs_fill(level);
        match self.pump.state() {
            PumpState::On if needs_fill => PumpState::On,
            PumpState::Off if needs_fill && percent < self.control.start_below_percent => {
                PumpState::On
            }
            _ => PumpState::Off,
        }
    }

    fn apply_overrides(&mut self, now: Instant, report: &mut CycleReport) -> Result<()> {
        let pending = self.inbox.drain();
        let mut heal = self.bridge.take_calibration_heal();

        if pending.empty_level.is_some() || pending.full_level.is_some() {
            let cur = self.calibration;
            let candidate = Calibration::new(
                pending.empty_level.unwrap_or(cur.empty_level()),
                pending.full_level.unwrap_or(cur.full_level()),
            );
            match candidate {
                Ok(cal) if cal == cur => {}
                Ok(cal) => {
                    tracing::info!(
                        empty_level = cal.empty_level(),
                        full_level = cal.full_level(),
                        "calibration updated remotely"
                    );
                    self.calibration = cal;
                    report.calibration_changed = true;
                    let _ = self.bridge.publish_calibration(&cal);
                    self.persist();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "calibration override rejected");
                    report.overrides_rejected += 1;
                    heal = true;
                }
            }
        }
        if heal {
            let _ = self.bridge.publish_calibration(&self.calibration);
        }

        if pending.stop {
            let t = self
                .pump
                .force_off(now, self.control.override_hold())
                .wrap_err("remote stop")?;
            tracing::info!(
                was_running = t.changed(),
                hold_ms = self.control.override_hold_ms,
                "remote stop"
            );
            let _ = self.bridge.publish_motor(PumpState::Off);
            report.remote_stop = true;
            if t.changed() {
                report.transition = Transition::Stopped;
            }
        }
        Ok(())
    }

    fn on_sample_error(
        &mut self,
        now: Instant,
        e: TankError,
        report: &mut CycleReport,
    ) -> Result<()> {
        self.echo_misses = self.echo_misses.saturating_add(1);
        tracing::warn!(error = %e, misses = self.echo_misses, "range sample failed");
        report.sample_error = Some(e);

        let max = self.control.max_echo_misses;
        if max > 0 && self.echo_misses >= max && self.pump.state().is_on() {
            tracing::warn!(
                misses = self.echo_misses,
                "no usable echo while pumping; stopping pump"
            );
            let t = self
                .pump
                .force_off(now, Duration::ZERO)
                .wrap_err("watchdog stop")?;
            if t.changed() {
                let _ = self.bridge.publish_motor(PumpState::Off);
                report.transition = Transition::Stopped;
                report.watchdog_stop = true;
            }
        }
        Ok(())
    }

    fn persist(&self) {
        let Some(path) = self.persist_file.as_deref() else {
            return;
        };
        if let Err(e) = save_calibration(path, &self.calibration) {
            tracing::warn!(error = %e, "could not persist calibration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::cycle_delay;
    use std::time::Duration;

    #[test]
    fn delay_is_cycle_outside_lockout() {
        let c = Duration::from_millis(100);
        assert_eq!(cycle_delay(c, Duration::ZERO), c);
        assert_eq!(cycle_delay(c, Duration::from_millis(40)), c);
    }

    #[test]
    fn delay_covers_remaining_lockout() {
        let c = Duration::from_millis(100);
        assert_eq!(
            cycle_delay(c, Duration::from_millis(2500)),
            Duration::from_millis(2500)
        );
    }
}

//! Two-state pump relay machine with start dwell and remote-stop hold-off.
//!
//! Every taken transition toggles the relay exactly once. Requests for the current state
//! are no-ops. Time is passed in by the caller so the machine stays clock-agnostic.

use std::time::{Duration, Instant};

use tank_traits::Relay;

use crate::error::TankError;
use crate::hw_error::map_relay_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PumpState {
    #[default]
    Off,
    On,
}

impl PumpState {
    /// Remote `motorStat` encoding: `true` = idle, `false` = running.
    pub fn motor_stat(self) -> bool {
        matches!(self, Self::Off)
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for PumpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::On => "on",
        })
    }
}

/// Outcome of a pump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the requested state.
    Unchanged,
    Started,
    Stopped,
    /// Refused: inside the dwell window after a start.
    LockedOut,
    /// Refused: start inhibited after a remote stop.
    HeldOff,
}

impl Transition {
    pub fn changed(self) -> bool {
        matches!(self, Self::Started | Self::Stopped)
    }
}

pub struct PumpMachine<R: Relay> {
    relay: R,
    state: PumpState,
    dwell: Duration,
    locked_until: Option<Instant>,
    held_until: Option<Instant>,
}

impl<R: Relay> PumpMachine<R> {
    /// Starts in `Off` without touching the relay; call `init` to drive it.
    pub fn new(relay: R, dwell: Duration) -> Self {
        Self {
            relay,
            state: PumpState::Off,
            dwell,
            locked_until: None,
            held_until: None,
        }
    }

    /// De-energize the relay so hardware matches the initial `Off` state.
    pub fn init(&mut self) -> Result<(), TankError> {
        self.relay.deenergize().map_err(|e| map_relay_error(&*e))?;
        self.state = PumpState::Off;
        Ok(())
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Time left before another transition is accepted.
    pub fn lockout_remaining(&self, now: Instant) -> Duration {
        self.locked_until
            .map_or(Duration::ZERO, |t| t.saturating_duration_since(now))
    }

    /// Time left before a remote stop stops inhibiting restarts.
    pub fn hold_remaining(&self, now: Instant) -> Duration {
        self.held_until
            .map_or(Duration::ZERO, |t| t.saturating_duration_since(now))
    }

    /// Move toward `want`, honoring the dwell lockout and any remote-stop hold.
    ///
    /// On a relay error the state is left unchanged.
    pub fn request(&mut self, want: PumpState, now: Instant) -> Result<Transition, TankError> {
        if want == self.state {
            return Ok(Transition::Unchanged);
        }
        if !self.lockout_remaining(now).is_zero() {
            return Ok(Transition::LockedOut);
        }
        match want {
            PumpState::On => {
                if !self.hold_remaining(now).is_zero() {
                    return Ok(Transition::HeldOff);
                }
                self.relay.energize().map_err(|e| map_relay_error(&*e))?;
                self.state = PumpState::On;
                self.locked_until = Some(now + self.dwell);
                Ok(Transition::Started)
            }
            PumpState::Off => self.switch_off(),
        }
    }

    /// Stop regardless of the dwell lockout and inhibit restarts for `hold`.
    ///
    /// The hold applies even when the pump was already off.
    pub fn force_off(&mut self, now: Instant, hold: Duration) -> Result<Transition, TankError> {
        if !hold.is_zero() {
            self.held_until = Some(now + hold);
        }
        if self.state == PumpState::Off {
            return Ok(Transition::Unchanged);
        }
        self.switch_off()
    }

    fn switch_off(&mut self) -> Result<Transition, TankError> {
        self.relay.deenergize().map_err(|e| map_relay_error(&*e))?;
        self.state = PumpState::Off;
        self.locked_until = None;
        Ok(Transition::Stopped)
    }
}

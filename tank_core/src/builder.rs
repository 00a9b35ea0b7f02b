//! Type-state builder for `Tank` and the generic `build_controller` constructor.
//!
//! The builder enforces at compile time that sensor, relay and remote store are provided
//! before `build()` is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tank_traits::clock::{Clock, MonotonicClock};
use tank_traits::{EchoSensor, Relay, RemoteStore, StatusPresenter};

use crate::config::{ControlCfg, FilterCfg, RemoteCfg, Timeouts};
use crate::controller::TankController;
use crate::error::{BuildError, Result};
use crate::filter::MovingAverage;
use crate::inbox::OverrideInbox;
use crate::level::Calibration;
use crate::pump::PumpMachine;
use crate::ranging::RangeSampler;
use crate::sync::SyncBridge;

/// Dynamically dispatched controller, as assembled by the builder.
pub type Tank = TankController<
    Box<dyn EchoSensor + Send>,
    Box<dyn Relay + Send>,
    Box<dyn RemoteStore + Send>,
>;

/// Everything besides the three devices. Unset fields fall back to defaults.
#[derive(Default)]
pub struct Settings {
    pub filter: FilterCfg,
    pub control: ControlCfg,
    pub timeouts: Timeouts,
    pub remote: RemoteCfg,
    pub calibration: Calibration,
    pub clock: Option<Box<dyn Clock + Send + Sync>>,
    pub presenter: Option<Box<dyn StatusPresenter + Send>>,
    pub persist_file: Option<PathBuf>,
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct TankBuilder<S, R, St> {
    sensor: Option<Box<dyn EchoSensor + Send>>,
    relay: Option<Box<dyn Relay + Send>>,
    store: Option<Box<dyn RemoteStore + Send>>,
    settings: Settings,
    _s: PhantomData<S>,
    _r: PhantomData<R>,
    _st: PhantomData<St>,
}

impl Default for TankBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            relay: None,
            store: None,
            settings: Settings::default(),
            _s: PhantomData,
            _r: PhantomData,
            _st: PhantomData,
        }
    }
}

impl Tank {
    pub fn builder() -> TankBuilder<Missing, Missing, Missing> {
        TankBuilder::default()
    }
}

/// Validate settings and assemble a controller. Shared by the builder and `build_controller`.
fn validate_and_build<S: EchoSensor, R: Relay, St: RemoteStore>(
    sensor: S,
    relay: R,
    store: St,
    settings: Settings,
) -> Result<TankController<S, R, St>> {
    let Settings {
        filter,
        control,
        timeouts,
        remote,
        calibration,
        clock,
        presenter,
        persist_file,
    } = settings;

    // ── Validation ───────────────────────────────────────────────────────────
    if filter.window == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "filter window must be >= 1",
        )));
    }
    if control.cycle_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "cycle_ms must be >= 1",
        )));
    }
    if control.start_below_percent == 0 || control.start_below_percent > 100 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "start_below_percent must be in 1..=100",
        )));
    }
    if timeouts.echo_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "echo_ms must be >= 1",
        )));
    }
    if timeouts.remote_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "remote_ms must be >= 1",
        )));
    }
    if !remote.base_path.starts_with('/') {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "remote base path must start with '/'",
        )));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    Ok(TankController {
        sampler: RangeSampler::new(sensor, Duration::from_millis(timeouts.echo_ms)),
        filter: MovingAverage::new(filter.window),
        pump: PumpMachine::new(relay, control.dwell()),
        bridge: SyncBridge::new(
            store,
            remote.base_path,
            Duration::from_millis(timeouts.remote_ms),
        ),
        inbox: OverrideInbox::new(),
        calibration,
        control,
        clock,
        presenter,
        persist_file,
        started: false,
        echo_misses: 0,
        last_level: None,
        last_percent: None,
    })
}

impl<S, R, St> TankBuilder<S, R, St> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Tank> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let relay = self
            .relay
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRelay))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        validate_and_build(sensor, relay, store, self.settings)
    }
}

/// Chainable setters that do not affect type-state.
impl<S, R, St> TankBuilder<S, R, St> {
    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.settings.filter = filter;
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.settings.control = control;
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.settings.timeouts = timeouts;
        self
    }
    pub fn with_remote(mut self, remote: RemoteCfg) -> Self {
        self.settings.remote = remote;
        self
    }
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.settings.calibration = calibration;
        self
    }
    /// Persist accepted calibration overrides to this file.
    pub fn with_persist_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.persist_file = Some(path.into());
        self
    }
    pub fn with_presenter(mut self, presenter: impl StatusPresenter + Send + 'static) -> Self {
        self.settings.presenter = Some(Box::new(presenter));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.settings.clock = Some(clock);
        self
    }

    fn retype<S2, R2, St2>(self) -> TankBuilder<S2, R2, St2> {
        TankBuilder {
            sensor: self.sensor,
            relay: self.relay,
            store: self.store,
            settings: self.settings,
            _s: PhantomData,
            _r: PhantomData,
            _st: PhantomData,
        }
    }
}

// Setters that advance type-state
impl<R, St> TankBuilder<Missing, R, St> {
    pub fn with_sensor(
        mut self,
        sensor: impl EchoSensor + Send + 'static,
    ) -> TankBuilder<Set, R, St> {
        self.sensor = Some(Box::new(sensor));
        self.retype()
    }
}

impl<S, St> TankBuilder<S, Missing, St> {
    pub fn with_relay(mut self, relay: impl Relay + Send + 'static) -> TankBuilder<S, Set, St> {
        self.relay = Some(Box::new(relay));
        self.retype()
    }
}

impl<S, R> TankBuilder<S, R, Missing> {
    pub fn with_store(
        mut self,
        store: impl RemoteStore + Send + 'static,
    ) -> TankBuilder<S, R, Set> {
        self.store = Some(Box::new(store));
        self.retype()
    }
}

impl TankBuilder<Set, Set, Set> {
    /// Validate and build. Only available once sensor, relay and store are set.
    pub fn build(self) -> Result<Tank> {
        self.try_build()
    }
}

/// Build a statically dispatched controller from concrete devices.
pub fn build_controller<S, R, St>(
    sensor: S,
    relay: R,
    store: St,
    settings: Settings,
) -> Result<TankController<S, R, St>>
where
    S: EchoSensor,
    R: Relay,
    St: RemoteStore,
{
    validate_and_build(sensor, relay, store, settings)
}

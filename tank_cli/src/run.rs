//! Device assembly, config mapping and the `run` / `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use tank_core::{RangeSampler, RunSummary, Tank};
use tank_hardware::{RemoteInjector, SimulatedStore};
use tank_traits::{EchoSensor, Relay};

use crate::cli::RemoteSet;

/// Devices the controller is assembled from. The remote store is always the in-process one.
pub struct Devices {
    pub sensor: Box<dyn EchoSensor + Send>,
    pub relay: Box<dyn Relay + Send>,
    pub store: SimulatedStore,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn env_f32(name: &str, default: f32) -> eyre::Result<f32> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<f32>()
            .wrap_err_with(|| format!("{name} must be a number, got {v:?}")),
        Err(_) => Ok(default),
    }
}

/// Simulated tank, steered by `TANK_SIM_*` / `TANK_TEST_*` environment knobs.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_devices(_cfg: &tank_config::Config) -> eyre::Result<Devices> {
    let start_cm = env_f32("TANK_SIM_START_CM", 60.0)?;
    let fill = env_f32("TANK_SIM_FILL_CM", 2.0)?;
    let drain = env_f32("TANK_SIM_DRAIN_CM", 0.1)?;
    let tank = tank_hardware::SimulatedTank::new(start_cm).with_rates(fill, drain);
    if env_flag("TANK_TEST_NO_ECHO") {
        tank.set_no_echo(true);
    }
    tracing::info!(start_cm, fill, drain, "using simulated tank");
    Ok(Devices {
        sensor: Box::new(tank.sensor()),
        relay: Box::new(tank.relay()),
        store: open_store(),
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_devices(cfg: &tank_config::Config) -> eyre::Result<Devices> {
    let p = &cfg.pins;
    let sensor = tank_hardware::hcsr04::Hcsr04::new(p.trigger, p.echo)
        .wrap_err("open HC-SR04 trigger/echo pins")?;
    let relay = tank_hardware::relay::GpioRelay::new(p.relay, cfg.relay.active_low)
        .wrap_err("open relay pin")?;
    tracing::info!(
        trigger = p.trigger,
        echo = p.echo,
        relay = p.relay,
        active_low = cfg.relay.active_low,
        "using GPIO hardware"
    );
    Ok(Devices {
        sensor: Box::new(sensor),
        relay: Box::new(relay),
        store: open_store(),
    })
}

fn open_store() -> SimulatedStore {
    let store = SimulatedStore::new();
    if env_flag("TANK_TEST_REMOTE_FAIL") {
        store.injector().set_fail_writes(true);
    }
    store
}

/// Map config sections onto the builder and assemble the controller.
pub fn build_tank(
    cfg: &tank_config::Config,
    devices: Devices,
) -> eyre::Result<(Tank, RemoteInjector)> {
    let calibration = tank_core::persist::load_calibration(&cfg.calibration)?;
    let remote = devices.store.injector();
    let mut builder = Tank::builder()
        .with_sensor(devices.sensor)
        .with_relay(devices.relay)
        .with_store(devices.store)
        .with_filter((&cfg.filter).into())
        .with_control((&cfg.control).into())
        .with_timeouts((&cfg.timeouts).into())
        .with_remote((&cfg.remote).into())
        .with_calibration(calibration)
        .with_presenter(tank_ui::ConsolePresenter::stderr());
    if let Some(f) = cfg.calibration.persist_file.as_deref() {
        builder = builder.with_persist_file(f);
    }
    Ok((builder.build()?, remote))
}

pub fn run_tank(
    cfg: &tank_config::Config,
    cycles: Option<u64>,
    remote_sets: &[RemoteSet],
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let devices = open_devices(cfg)?;
    let (mut tank, remote) = build_tank(cfg, devices)?;

    // subscribe first so injected writes reach the controller like live updates
    tank.start()?;
    for s in remote_sets {
        let path = format!("{}{}", cfg.remote.base_path, s.child);
        tracing::info!(path = %path, value = %s.value, "injecting remote write");
        remote.set(&path, &s.value);
    }
    if env_flag("TANK_TEST_STREAM_TIMEOUT") {
        remote.timeout();
    }

    tank_core::run(&mut tank, &shutdown, cycles)
}

/// Result of a self-check: one ranging with the relay driven off.
#[derive(Debug, Clone, Copy)]
pub struct SelfCheck {
    pub distance_cm: i32,
    pub percent: u8,
}

pub fn self_check(cfg: &tank_config::Config) -> eyre::Result<SelfCheck> {
    let mut devices = open_devices(cfg)?;
    devices
        .relay
        .deenergize()
        .map_err(|e| tank_core::hw_error::map_relay_error(&*e))
        .wrap_err("drive pump relay off")?;

    let calibration = tank_core::persist::load_calibration(&cfg.calibration)?;
    let mut sampler =
        RangeSampler::new(devices.sensor, Duration::from_millis(cfg.timeouts.echo_ms));
    let distance_cm = sampler.sample().wrap_err("range once")?;
    let percent = calibration.percent(distance_cm);
    tracing::info!(distance_cm, percent, "self-check ok");
    Ok(SelfCheck {
        distance_cm,
        percent,
    })
}

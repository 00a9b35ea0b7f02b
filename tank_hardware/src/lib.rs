pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hcsr04;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod relay;
pub mod store;
pub mod util;

pub use store::{RemoteInjector, SimulatedStore};

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tank_traits::{BoxError, EchoSensor, Relay};

use crate::error::HwError;

/// Echo microseconds per centimeter of distance (round trip at ~340 m/s).
const ECHO_US_PER_CM: f32 = 1000.0 / 17.0;

/// Physical tank model shared by the simulated sensor and relay.
#[derive(Debug, Clone)]
struct TankModel {
    distance_cm: f32,
    pump_on: bool,
    /// Distance change per reading while the pump runs (surface rises toward the sensor).
    fill_cm_per_read: f32,
    /// Distance change per reading while idle (consumption drains the tank).
    drain_cm_per_read: f32,
    /// Closest the surface can get (overflow height).
    min_cm: f32,
    /// Bottom of the tank.
    max_cm: f32,
    reads: u64,
    no_echo: bool,
}

/// Handle for steering the simulated tank from tests and the CLI.
#[derive(Debug, Clone)]
pub struct SimulatedTank {
    model: Arc<Mutex<TankModel>>,
}

impl SimulatedTank {
    /// New tank whose water surface sits `distance_cm` below the sensor.
    pub fn new(distance_cm: f32) -> Self {
        SimulatedTank {
            model: Arc::new(Mutex::new(TankModel {
                distance_cm,
                pump_on: false,
                fill_cm_per_read: 2.0,
                drain_cm_per_read: 0.1,
                min_cm: 2.0,
                max_cm: 120.0,
                reads: 0,
                no_echo: false,
            })),
        }
    }

    pub fn with_rates(self, fill_cm_per_read: f32, drain_cm_per_read: f32) -> Self {
        if let Ok(mut m) = self.model.lock() {
            m.fill_cm_per_read = fill_cm_per_read;
            m.drain_cm_per_read = drain_cm_per_read;
        }
        self
    }

    /// Make every subsequent echo read time out.
    pub fn set_no_echo(&self, no_echo: bool) {
        if let Ok(mut m) = self.model.lock() {
            m.no_echo = no_echo;
        }
    }

    pub fn distance_cm(&self) -> f32 {
        self.model.lock().map(|m| m.distance_cm).unwrap_or(f32::NAN)
    }

    pub fn pump_on(&self) -> bool {
        self.model.lock().map(|m| m.pump_on).unwrap_or(false)
    }

    pub fn reads(&self) -> u64 {
        self.model.lock().map(|m| m.reads).unwrap_or(0)
    }

    pub fn sensor(&self) -> SimulatedEcho {
        SimulatedEcho {
            model: self.model.clone(),
        }
    }

    pub fn relay(&self) -> SimulatedRelay {
        SimulatedRelay {
            model: self.model.clone(),
        }
    }
}

fn poisoned() -> HwError {
    HwError::Gpio("simulated tank state poisoned".into())
}

/// Simulated HC-SR04: reports the modelled distance, then advances the model one step.
pub struct SimulatedEcho {
    model: Arc<Mutex<TankModel>>,
}

impl EchoSensor for SimulatedEcho {
    fn echo(&mut self, _timeout: Duration) -> Result<Duration, BoxError> {
        let mut m = self.model.lock().map_err(|_| poisoned())?;
        m.reads = m.reads.saturating_add(1);
        if m.no_echo {
            return Err(Box::new(HwError::EchoTimeout));
        }
        let d = m.distance_cm;
        let step = if m.pump_on {
            -m.fill_cm_per_read
        } else {
            m.drain_cm_per_read
        };
        m.distance_cm = (d + step).clamp(m.min_cm, m.max_cm);
        // rounded up so a whole-centimeter distance converts back to itself
        let echo_us = (d.max(0.0) * ECHO_US_PER_CM).ceil() as u64;
        tracing::trace!(distance_cm = d, echo_us, "simulated echo");
        Ok(Duration::from_micros(echo_us))
    }
}

/// Simulated relay: flips the pump flag in the shared tank model.
pub struct SimulatedRelay {
    model: Arc<Mutex<TankModel>>,
}

impl Relay for SimulatedRelay {
    fn energize(&mut self) -> Result<(), BoxError> {
        self.model.lock().map_err(|_| poisoned())?.pump_on = true;
        tracing::debug!("relay energized (simulated)");
        Ok(())
    }

    fn deenergize(&mut self) -> Result<(), BoxError> {
        self.model.lock().map_err(|_| poisoned())?.pump_on = false;
        tracing::debug!("relay de-energized (simulated)");
        Ok(())
    }
}

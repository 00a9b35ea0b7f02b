use rppal::gpio::{Gpio, OutputPin};

use crate::error::{HwError, Result};

/// Pump relay on a single GPIO output.
///
/// Most relay boards pull in on a low input, so `active_low` defaults to true in config.
/// The relay is left de-energized on construction.
pub struct GpioRelay {
    pin: OutputPin,
    active_low: bool,
}

impl GpioRelay {
    pub fn new(pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open relay pin {pin}: {e}")))?
            .into_output();
        let mut relay = Self { pin, active_low };
        relay.drive(false);
        Ok(relay)
    }

    fn drive(&mut self, energized: bool) {
        if energized != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

impl tank_traits::Relay for GpioRelay {
    fn energize(&mut self) -> std::result::Result<(), tank_traits::BoxError> {
        self.drive(true);
        tracing::debug!(active_low = self.active_low, "relay energized");
        Ok(())
    }

    fn deenergize(&mut self) -> std::result::Result<(), tank_traits::BoxError> {
        self.drive(false);
        tracing::debug!(active_low = self.active_low, "relay de-energized");
        Ok(())
    }
}

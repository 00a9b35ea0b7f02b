use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{measure_pulse_width, spin_delay};

/// Settle time with the trigger held low before a measurement.
const TRIGGER_SETTLE: Duration = Duration::from_micros(2);
/// Trigger high time; the HC-SR04 needs at least 10 us.
const TRIGGER_WIDTH: Duration = Duration::from_micros(10);

/// HC-SR04 style ultrasonic ranger on two GPIO lines.
pub struct Hcsr04 {
    trig: OutputPin,
    echo: InputPin,
}

impl Hcsr04 {
    pub fn new(trig_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut trig = gpio
            .get(trig_pin)
            .map_err(|e| HwError::Gpio(format!("open trigger pin {trig_pin}: {e}")))?
            .into_output();
        let echo = gpio
            .get(echo_pin)
            .map_err(|e| HwError::Gpio(format!("open echo pin {echo_pin}: {e}")))?
            .into_input();
        trig.set_low();
        Ok(Self { trig, echo })
    }

    /// Fire one trigger pulse and return the echo pulse width.
    pub fn pulse(&mut self, timeout: Duration) -> Result<Duration> {
        self.trig.set_low();
        spin_delay(TRIGGER_SETTLE);
        self.trig.set_high();
        spin_delay(TRIGGER_WIDTH);
        self.trig.set_low();

        let echo = &self.echo;
        let width = measure_pulse_width(|| echo.is_high(), timeout, Duration::ZERO)?;
        trace!(echo_us = width.as_micros() as u64, "hcsr04 echo");
        Ok(width)
    }
}

impl tank_traits::EchoSensor for Hcsr04 {
    fn echo(&mut self, timeout: Duration) -> std::result::Result<Duration, tank_traits::BoxError> {
        self.pulse(timeout).map_err(Into::into)
    }
}

//! Raspberry Pi GPIO adapter (rppal).
//!
//! Implements the `plantbot-core` `OutputPin` over a single BCM-numbered pin.

use rppal::gpio::{self, Gpio};

use plantbot_core::{actuator::OutputPin, errors::Error, Result};

/// The pump relay pin.
///
/// Acquired once at startup. When dropped, rppal resets the pin to the mode it
/// had before we took it.
pub struct GpioPin {
    number: u8,
    pin: gpio::OutputPin,
}

impl GpioPin {
    /// Open the GPIO peripheral and configure `number` as an output, driven low.
    pub fn open(number: u8) -> Result<Self> {
        let pin = Gpio::new()
            .and_then(|g| g.get(number))
            .map_err(|e| map_err(number, e))?
            .into_output_low();
        tracing::info!(pin = number, "gpio output ready");
        Ok(Self { number, pin })
    }
}

impl OutputPin for GpioPin {
    fn set_high(&mut self) {
        self.pin.set_high();
        tracing::debug!(pin = self.number, "gpio high");
    }

    fn set_low(&mut self) {
        self.pin.set_low();
        tracing::debug!(pin = self.number, "gpio low");
    }
}

fn map_err(number: u8, e: gpio::Error) -> Error {
    Error::Hardware(format!("gpio pin {number}: {e}"))
}

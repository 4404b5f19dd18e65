use std::time::Duration;

use tokio::time::{sleep, Instant};

/// A single digital output line.
///
/// The GPIO adapter implements this over the Raspberry Pi's BCM pins; tests
/// use a recording fake.
pub trait OutputPin: Send {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Holds the pin high for as long as it is alive.
///
/// Dropping the guard always drives the pin low, whether the wait completed,
/// the future was cancelled, or something panicked in between.
#[must_use = "the pin goes low as soon as the guard is dropped"]
pub struct ActiveGuard<'a, P: OutputPin> {
    pin: &'a mut P,
}

impl<'a, P: OutputPin> ActiveGuard<'a, P> {
    pub fn engage(pin: &'a mut P) -> Self {
        pin.set_high();
        Self { pin }
    }
}

impl<P: OutputPin> Drop for ActiveGuard<'_, P> {
    fn drop(&mut self) {
        self.pin.set_low();
    }
}

/// Drives the pump pin for a requested number of seconds.
pub struct Actuator<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> Actuator<P> {
    /// Takes ownership of the pin and makes sure it starts out low.
    pub fn new(mut pin: P) -> Self {
        pin.set_low();
        Self { pin }
    }

    /// Set the output high, wait `seconds`, then set it low.
    ///
    /// Not interruptible: the caller is blocked for the full duration.
    pub async fn run(&mut self, seconds: u64) {
        let started = Instant::now();
        tracing::info!(seconds, "output on");
        {
            let _active = ActiveGuard::engage(&mut self.pin);
            sleep(Duration::from_secs(seconds)).await;
        }
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "output off");
    }
}

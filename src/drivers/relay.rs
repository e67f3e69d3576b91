//! Digital output driver for the charge relay, charge-enable line and
//! fault indicator.
//!
//! Wraps any `embedded_hal::digital::OutputPin`.  Writes never propagate
//! errors upward: a failed write is logged, counted, and the cached level
//! is left unchanged so `is_high()` reports what the pin was last known to
//! be driven to.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::error;

pub struct DigitalOutput<P> {
    pin: P,
    label: &'static str,
    high: bool,
    write_failures: u32,
}

impl<P: OutputPin> DigitalOutput<P> {
    /// Wrap `pin` and drive it low.
    pub fn new(pin: P, label: &'static str) -> Self {
        let mut out = Self {
            pin,
            label,
            high: false,
            write_failures: 0,
        };
        out.set(false);
        out
    }

    pub fn set(&mut self, high: bool) {
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.high = high,
            Err(e) => {
                self.write_failures = self.write_failures.saturating_add(1);
                error!("{}: write {} failed: {:?}", self.label, high, e);
            }
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

/// In-memory pin for host builds.  Counts level changes.
#[derive(Debug, Default)]
pub struct SimPin {
    level: bool,
    toggles: u32,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.level
    }

    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    fn drive(&mut self, level: bool) {
        if self.level != level {
            self.toggles += 1;
        }
        self.level = level;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

//! Two-LED status indicator (red = alert, green = ok).
//!
//! Exactly one LED is lit while the controller runs.  A change of
//! indicator is written as two pin updates; the newly selected LED is
//! always lit **before** the other one is cleared, so an observer may
//! briefly see both on but never both off.
//!
//! Between `configure` and the first verdict (which includes the
//! temperature settle time) nothing is known yet, so the alert LED is lit.
//!
//! ```text
//!   configure    ─▶ alert HIGH ─▶ ok LOW
//!   show(alert)  ─▶ alert HIGH ─▶ ok LOW
//!   show(ok)     ─▶ ok HIGH    ─▶ alert LOW
//! ```

use crate::app::ports::{HardwarePort, Level};
use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Alert,
    Ok,
}

pub struct StatusLeds {
    alert_pin: u8,
    ok_pin: u8,
    lit: Option<Indicator>,
}

impl StatusLeds {
    pub fn new(alert_pin: u8, ok_pin: u8) -> Self {
        Self {
            alert_pin,
            ok_pin,
            lit: None,
        }
    }

    /// Claim both pins as outputs and show alert until the first verdict.
    pub fn configure(&mut self, hw: &mut impl HardwarePort) -> Result<(), HwError> {
        hw.configure_output(self.alert_pin)?;
        hw.configure_output(self.ok_pin)?;
        self.show(true, hw)
    }

    /// Light the alert LED when `alert` is true, the ok LED otherwise.
    ///
    /// Both pins are rewritten every call so a dropped write on a previous
    /// cycle is corrected on the next.
    pub fn show(&mut self, alert: bool, hw: &mut impl HardwarePort) -> Result<(), HwError> {
        let (on, off, target) = if alert {
            (self.alert_pin, self.ok_pin, Indicator::Alert)
        } else {
            (self.ok_pin, self.alert_pin, Indicator::Ok)
        };
        hw.set_digital(on, Level::High)?;
        hw.set_digital(off, Level::Low)?;
        self.lit = Some(target);
        Ok(())
    }

    /// Turn both LEDs off (shutdown only).  Attempts both pins even if the
    /// first write fails.
    pub fn off(&mut self, hw: &mut impl HardwarePort) -> Result<(), HwError> {
        let alert = hw.set_digital(self.alert_pin, Level::Low);
        let ok = hw.set_digital(self.ok_pin, Level::Low);
        self.lit = None;
        alert.and(ok)
    }

    pub fn lit(&self) -> Option<Indicator> {
        self.lit
    }
}

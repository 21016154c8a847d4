//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (GPIO/ADC/PWM, wall clock, console) implement these
//! traits.  The [`ControlLoop`](super::service::ControlLoop) consumes them
//! via generics, so the domain core never touches hardware directly.

use core::time::Duration;

use crate::error::HwError;
use crate::scheduler::TimeOfDay;

// ───────────────────────────────────────────────────────────────
// Hardware port (driven adapter: domain ↔ pins, buses, converters)
// ───────────────────────────────────────────────────────────────

/// Opaque handle returned by [`HardwarePort::configure_pwm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PwmHandle(pub u8);

/// Logic level for a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Read/write primitives the core needs from the board.
///
/// Every call is blocking and returns promptly except
/// [`read_onewire_temperature`](Self::read_onewire_temperature), which the
/// caller must precede with a conversion and a settle wait.
pub trait HardwarePort {
    /// Claim `pin` as a push-pull digital output, initially low.
    fn configure_output(&mut self, pin: u8) -> Result<(), HwError>;

    /// Claim `pin` as a PWM output at `frequency_hz`, duty 0 %.
    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<PwmHandle, HwError>;

    /// Set duty cycle in percent (0.0 – 100.0).
    fn set_duty_cycle(&mut self, pwm: PwmHandle, percent: f32) -> Result<(), HwError>;

    /// Drive a configured output pin.
    fn set_digital(&mut self, pin: u8, level: Level) -> Result<(), HwError>;

    /// Sample an ADC channel.  The result is normalised to 0 ..= 65535.
    fn read_adc(&mut self, channel: u8) -> Result<u16, HwError>;

    /// Start a temperature conversion on the 1-Wire bus attached to `bus`.
    fn begin_onewire_conversion(&mut self, bus: u8) -> Result<(), HwError>;

    /// Fetch the last converted temperature in °C.
    fn read_onewire_temperature(&mut self, bus: u8) -> Result<f32, HwError>;

    /// Release every claimed pin and bus, leaving outputs low.
    fn release(&mut self) -> Result<(), HwError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain ↔ wall clock + delays)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Local wall-clock time at minute resolution.
    fn now(&self) -> TimeOfDay;

    /// Block the calling thread.
    fn sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → console / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Purely observational: nothing the sink does feeds
/// back into control decisions.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

//! DS18B20 waterproof temperature probe on a 1-Wire bus.
//!
//! The probe needs an explicit conversion command followed by a fixed
//! settle time (750 ms at 12-bit resolution) before the scratchpad holds a
//! fresh value.  The wait happens on the injected clock so tests can run it
//! instantly.
//!
//! ## Raw representation
//!
//! The hardware port hands back °C, and the sample's `value` is that
//! reading rounded to 2 decimals.  The `raw` field keeps the device-native
//! encoding for logs: the signed 12-bit register in 1/16 °C steps, stored
//! two's-complement in a `u16`.  `value` is never derived from `raw`.

use core::time::Duration;

use log::warn;

use crate::app::ports::{ClockPort, HardwarePort};
use crate::error::SensorError;

use super::{SensorKind, SensorReader, SensorSample, round_to};

/// Datasheet conversion time at 12-bit resolution.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(750);

/// Measurable range of the DS18B20.
const MIN_C: f32 = -55.0;
const MAX_C: f32 = 125.0;
/// Register LSB in °C.
const COUNTS_PER_C: f32 = 16.0;

#[derive(Debug, Clone)]
pub struct TemperatureProbe {
    bus: u8,
    settle: Duration,
}

impl TemperatureProbe {
    pub fn new(bus: u8, settle: Duration) -> Self {
        Self { bus, settle }
    }

    /// Encode °C into the DS18B20 register format, clamping to the
    /// device's measurable range.
    pub fn celsius_to_raw(celsius: f32) -> u16 {
        let clamped = celsius.clamp(MIN_C, MAX_C);
        ((clamped * COUNTS_PER_C).round() as i16) as u16
    }

    /// Convert, wait out the settle time, then read °C clamped to the
    /// probe's range.
    fn read_celsius(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<f32, SensorError> {
        hw.begin_onewire_conversion(self.bus)?;
        clock.sleep(self.settle);
        let celsius = hw.read_onewire_temperature(self.bus)?;
        if !celsius.is_finite() {
            return Err(SensorError::BusFault);
        }
        if !(MIN_C..=MAX_C).contains(&celsius) {
            warn!(
                "temperature: {:.2}\u{00b0}C outside probe range ({}), clamping",
                celsius,
                SensorError::OutOfRangeRaw
            );
        }
        Ok(celsius.clamp(MIN_C, MAX_C))
    }
}

impl SensorReader for TemperatureProbe {
    fn kind(&self) -> SensorKind {
        SensorKind::Temperature
    }

    fn read_raw(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<u16, SensorError> {
        self.read_celsius(hw, clock).map(Self::celsius_to_raw)
    }

    /// Decodes a register value.  Live samples take their value straight
    /// from the °C reading in `sample`.
    fn to_engineering_units(&self, raw: u16) -> f32 {
        round_to(f32::from(raw as i16) / COUNTS_PER_C, 2)
    }

    fn sample(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<SensorSample, SensorError> {
        let celsius = self.read_celsius(hw, clock)?;
        Ok(SensorSample {
            kind: SensorKind::Temperature,
            raw: Self::celsius_to_raw(celsius),
            value: round_to(celsius, 2),
        })
    }
}

//! pH probe analog front-end read through the ADC.
//!
//! The conversion is a fixed linear proxy: the ADC fraction is scaled to a
//! 3.3 V reference and multiplied by 3.5.  It matches the simulated
//! potentiometer front-end the enclosure was prototyped with and is **not**
//! a Nernst calibration; a real electrode needs a two-point calibration in
//! its place.

use crate::app::ports::{ClockPort, HardwarePort};
use crate::error::SensorError;

use super::{SensorKind, SensorReader, clamp_adc, round_to};

const V_REF: f32 = 3.3;
const PH_PER_VOLT: f32 = 3.5;

#[derive(Debug, Clone)]
pub struct PhProbe {
    channel: u8,
    device_max: u16,
}

impl PhProbe {
    pub fn new(channel: u8, device_max: u16) -> Self {
        Self {
            channel,
            device_max,
        }
    }
}

impl SensorReader for PhProbe {
    fn kind(&self) -> SensorKind {
        SensorKind::Ph
    }

    fn read_raw(
        &mut self,
        hw: &mut impl HardwarePort,
        _clock: &mut impl ClockPort,
    ) -> Result<u16, SensorError> {
        let raw = hw.read_adc(self.channel)?;
        Ok(clamp_adc(self.kind(), raw, self.device_max))
    }

    fn to_engineering_units(&self, raw: u16) -> f32 {
        let fraction = f32::from(raw) / f32::from(self.device_max);
        round_to(fraction * V_REF * PH_PER_VOLT, 2)
    }
}

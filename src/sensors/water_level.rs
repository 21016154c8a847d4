//! Resistive water-level sender read through the ADC.
//!
//! The sender's wiper voltage is proportional to float height, so percent
//! full is the ADC fraction scaled to 100.

use crate::app::ports::{ClockPort, HardwarePort};
use crate::error::SensorError;

use super::{SensorKind, SensorReader, clamp_adc, round_to};

#[derive(Debug, Clone)]
pub struct LevelProbe {
    channel: u8,
    device_max: u16,
}

impl LevelProbe {
    pub fn new(channel: u8, device_max: u16) -> Self {
        Self {
            channel,
            device_max,
        }
    }
}

impl SensorReader for LevelProbe {
    fn kind(&self) -> SensorKind {
        SensorKind::Level
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
        round_to(fraction * 100.0, 1)
    }
}

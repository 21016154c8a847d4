//! In-crate test doubles for the port traits.

use std::collections::HashMap;
use std::time::Duration;

use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, HardwarePort, Level, PwmHandle};
use crate::error::HwError;
use crate::scheduler::TimeOfDay;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConfigureOutput(u8),
    ConfigurePwm(u8, u32),
    Duty(u8, f32),
    Digital(u8, Level),
    Release,
}

#[derive(Default)]
pub struct FakeHardware {
    pub calls: Vec<Call>,
    pub adc: HashMap<u8, u16>,
    pub temperature: Option<f32>,
    /// Output pins whose writes are rejected.
    pub failing_pins: Vec<u8>,
    pwm_pins: Vec<u8>,
}

impl FakeHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, pin: u8) -> Option<Level> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Digital(p, level) if *p == pin => Some(*level),
            _ => None,
        })
    }

    pub fn duty(&self, pin: u8) -> Option<f32> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Duty(p, d) if *p == pin => Some(*d),
            _ => None,
        })
    }

    pub fn writes_to(&self, pin: u8) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Digital(p, _) | Call::Duty(p, _) if *p == pin))
            .count()
    }
}

impl HardwarePort for FakeHardware {
    fn configure_output(&mut self, pin: u8) -> Result<(), HwError> {
        self.calls.push(Call::ConfigureOutput(pin));
        Ok(())
    }

    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<PwmHandle, HwError> {
        self.calls.push(Call::ConfigurePwm(pin, frequency_hz));
        self.pwm_pins.push(pin);
        Ok(PwmHandle((self.pwm_pins.len() - 1) as u8))
    }

    fn set_duty_cycle(&mut self, pwm: PwmHandle, percent: f32) -> Result<(), HwError> {
        let pin = *self
            .pwm_pins
            .get(usize::from(pwm.0))
            .ok_or(HwError::NotConfigured(pwm.0))?;
        if self.failing_pins.contains(&pin) {
            return Err(HwError::NotAcknowledged);
        }
        self.calls.push(Call::Duty(pin, percent));
        Ok(())
    }

    fn set_digital(&mut self, pin: u8, level: Level) -> Result<(), HwError> {
        if self.failing_pins.contains(&pin) {
            return Err(HwError::NotAcknowledged);
        }
        self.calls.push(Call::Digital(pin, level));
        Ok(())
    }

    fn read_adc(&mut self, channel: u8) -> Result<u16, HwError> {
        self.adc.get(&channel).copied().ok_or(HwError::NoDevice)
    }

    fn begin_onewire_conversion(&mut self, _bus: u8) -> Result<(), HwError> {
        self.temperature.map(|_| ()).ok_or(HwError::NoDevice)
    }

    fn read_onewire_temperature(&mut self, _bus: u8) -> Result<f32, HwError> {
        self.temperature.ok_or(HwError::NoDevice)
    }

    fn release(&mut self) -> Result<(), HwError> {
        self.calls.push(Call::Release);
        Ok(())
    }
}

pub struct FakeClock {
    pub now: TimeOfDay,
    pub slept: Vec<Duration>,
}

impl FakeClock {
    pub fn at(hour: u8, minute: u8) -> Self {
        Self {
            now: TimeOfDay::new(hour, minute).unwrap(),
            slept: Vec::new(),
        }
    }
}

impl ClockPort for FakeClock {
    fn now(&self) -> TimeOfDay {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

#[derive(Default)]
pub struct VecSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

//! Mock adapters for integration tests.
//!
//! State lives behind `Rc<RefCell<..>>` and the handles are `Clone`, so a
//! test keeps one handle while the control loop owns the other.  That
//! lets tests inspect the board after the loop has been dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use aquamon::app::events::AppEvent;
use aquamon::app::ports::{ClockPort, EventSink, HardwarePort, Level, PwmHandle};
use aquamon::error::HwError;
use aquamon::scheduler::TimeOfDay;

// ── MockHardware ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct BoardState {
    pub adc: HashMap<u8, u16>,
    pub temperature: Option<f32>,
    /// Pins whose writes fail.
    pub failing_pins: Vec<u8>,
    /// Pins whose claim fails.
    pub rejected_claims: Vec<u8>,
    pub outputs: HashMap<u8, Level>,
    pub pwm_pins: Vec<u8>,
    /// Every duty write, in order.
    pub duty_log: Vec<(u8, f32)>,
    pub released: bool,
}

#[derive(Clone, Default)]
pub struct MockHardware(Rc<RefCell<BoardState>>);

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_adc(&self, channel: u8, raw: u16) {
        self.0.borrow_mut().adc.insert(channel, raw);
    }

    pub fn clear_adc(&self, channel: u8) {
        self.0.borrow_mut().adc.remove(&channel);
    }

    pub fn set_temperature(&self, celsius: Option<f32>) {
        self.0.borrow_mut().temperature = celsius;
    }

    pub fn fail_pin(&self, pin: u8) {
        self.0.borrow_mut().failing_pins.push(pin);
    }

    pub fn reject_claim(&self, pin: u8) {
        self.0.borrow_mut().rejected_claims.push(pin);
    }

    pub fn output(&self, pin: u8) -> Option<Level> {
        self.0.borrow().outputs.get(&pin).copied()
    }

    pub fn duties(&self, pin: u8) -> Vec<f32> {
        self.0
            .borrow()
            .duty_log
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, d)| *d)
            .collect()
    }

    pub fn released(&self) -> bool {
        self.0.borrow().released
    }
}

impl HardwarePort for MockHardware {
    fn configure_output(&mut self, pin: u8) -> Result<(), HwError> {
        let mut s = self.0.borrow_mut();
        if s.rejected_claims.contains(&pin) {
            return Err(HwError::NotConfigured(pin));
        }
        s.outputs.insert(pin, Level::Low);
        Ok(())
    }

    fn configure_pwm(&mut self, pin: u8, _frequency_hz: u32) -> Result<PwmHandle, HwError> {
        let mut s = self.0.borrow_mut();
        if s.rejected_claims.contains(&pin) {
            return Err(HwError::NotConfigured(pin));
        }
        s.pwm_pins.push(pin);
        Ok(PwmHandle((s.pwm_pins.len() - 1) as u8))
    }

    fn set_duty_cycle(&mut self, pwm: PwmHandle, percent: f32) -> Result<(), HwError> {
        let mut s = self.0.borrow_mut();
        let pin = *s
            .pwm_pins
            .get(usize::from(pwm.0))
            .ok_or(HwError::NotConfigured(pwm.0))?;
        if s.failing_pins.contains(&pin) {
            return Err(HwError::NotAcknowledged);
        }
        s.duty_log.push((pin, percent));
        Ok(())
    }

    fn set_digital(&mut self, pin: u8, level: Level) -> Result<(), HwError> {
        let mut s = self.0.borrow_mut();
        if s.failing_pins.contains(&pin) {
            return Err(HwError::NotAcknowledged);
        }
        let slot = s.outputs.get_mut(&pin).ok_or(HwError::NotConfigured(pin))?;
        *slot = level;
        Ok(())
    }

    fn read_adc(&mut self, channel: u8) -> Result<u16, HwError> {
        self.0
            .borrow()
            .adc
            .get(&channel)
            .copied()
            .ok_or(HwError::NoDevice)
    }

    fn begin_onewire_conversion(&mut self, _bus: u8) -> Result<(), HwError> {
        self.0
            .borrow()
            .temperature
            .map(|_| ())
            .ok_or(HwError::NoDevice)
    }

    fn read_onewire_temperature(&mut self, _bus: u8) -> Result<f32, HwError> {
        self.0.borrow().temperature.ok_or(HwError::NoDevice)
    }

    fn release(&mut self) -> Result<(), HwError> {
        let mut s = self.0.borrow_mut();
        for level in s.outputs.values_mut() {
            *level = Level::Low;
        }
        s.released = true;
        Ok(())
    }
}

// ── MockClock ─────────────────────────────────────────────────

/// Wall clock that advances by exactly the time slept.
#[derive(Debug, Default)]
pub struct ClockState {
    /// Minutes since midnight.
    pub minutes: u32,
    /// Sub-minute remainder of the time slept.
    pub carry: Duration,
    pub slept: Duration,
}

#[derive(Clone, Default)]
pub struct MockClock(Rc<RefCell<ClockState>>);

#[allow(dead_code)]
impl MockClock {
    pub fn at(hour: u32, minute: u32) -> Self {
        let clock = Self::default();
        clock.set(hour, minute);
        clock
    }

    pub fn set(&self, hour: u32, minute: u32) {
        let mut s = self.0.borrow_mut();
        s.minutes = hour * 60 + minute;
        s.carry = Duration::ZERO;
    }

    pub fn slept(&self) -> Duration {
        self.0.borrow().slept
    }
}

impl ClockPort for MockClock {
    fn now(&self) -> TimeOfDay {
        let m = self.0.borrow().minutes;
        TimeOfDay::new((m / 60 % 24) as u8, (m % 60) as u8).unwrap_or(TimeOfDay::MIDNIGHT)
    }

    fn sleep(&mut self, duration: Duration) {
        let mut s = self.0.borrow_mut();
        s.slept += duration;
        s.carry += duration;
        while s.carry >= Duration::from_secs(60) {
            s.carry -= Duration::from_secs(60);
            s.minutes = (s.minutes + 1) % (24 * 60);
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink(Rc<RefCell<Vec<AppEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.0.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn last(&self) -> Option<AppEvent> {
        self.0.borrow().last().cloned()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

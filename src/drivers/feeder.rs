//! Servo-gated fish feeder.
//!
//! One feeding is a blocking three-phase sequence:
//!
//! ```text
//!   Idle ──open()──▶ Opening ──close()──▶ Closing ──release()──▶ Idle
//!          servo→open        servo→closed         duty→0
//!          sleep(dwell)      sleep(settle)
//! ```
//!
//! The final phase drops the PWM duty to zero so the servo is not held
//! against its end stop (SG90s buzz and heat when held).  While the
//! sequence runs nothing else in the controller executes.
//!
//! ## Re-entrancy
//!
//! A trigger that arrives while the state is not `Idle` is ignored: it is
//! neither queued nor allowed to restart or extend the running sequence.

use core::fmt;
use core::time::Duration;

use log::{debug, error, info};

use super::{Actuator, ActuatorState};
use crate::app::ports::{ClockPort, HardwarePort, PwmHandle};
use crate::error::{ActuatorError, HwError};

/// SG90 convention at 50 Hz: 0.5 ms pulse (2.5 %) at 0°, 2.5 ms (12.5 %)
/// at 180°.
pub fn angle_to_duty(angle_deg: f32) -> f32 {
    2.5 + angle_deg / 18.0
}

/// Duty that leaves the servo unpowered.
pub const NEUTRAL_DUTY: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederState {
    Idle,
    Opening,
    Closing,
}

impl fmt::Display for FeederState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Opening => write!(f, "OPENING"),
            Self::Closing => write!(f, "CLOSING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Full open/close/release sequence ran.
    Completed,
    /// A sequence was already running; nothing was commanded.
    Ignored,
}

/// Gate positions and hold times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeederMotion {
    pub open_angle_deg: f32,
    pub closed_angle_deg: f32,
    pub dwell: Duration,
    pub settle: Duration,
}

pub struct FeederActuator {
    pin: u8,
    frequency_hz: u32,
    motion: FeederMotion,
    pwm: Option<PwmHandle>,
    state: FeederState,
    duty: f32,
}

impl FeederActuator {
    pub fn new(pin: u8, frequency_hz: u32, motion: FeederMotion) -> Self {
        Self {
            pin,
            frequency_hz,
            motion,
            pwm: None,
            state: FeederState::Idle,
            duty: NEUTRAL_DUTY,
        }
    }

    /// Run one complete feeding.
    ///
    /// On a hardware failure the servo is de-energised, the state returns
    /// to `Idle` and the error is reported.
    pub fn trigger(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<FeedOutcome, ActuatorError> {
        if self.state != FeederState::Idle {
            debug!("Feeder: trigger ignored while {}", self.state);
            return Ok(FeedOutcome::Ignored);
        }
        info!("Feeder: dispensing");
        let result = self
            .open(hw, clock)
            .and_then(|()| self.close(hw, clock))
            .and_then(|()| self.release(hw));
        match result {
            Ok(()) => {
                info!("Feeder: cycle complete");
                Ok(FeedOutcome::Completed)
            }
            Err(e) => {
                error!("Feeder: {} during {}, de-energising", e, self.state);
                let _ = self.neutralize(hw);
                Err(e)
            }
        }
    }

    /// `Idle -> Opening`: swing to the open angle and hold for the dwell.
    pub fn open(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<(), ActuatorError> {
        self.expect(FeederState::Idle)?;
        self.drive(hw, angle_to_duty(self.motion.open_angle_deg))?;
        self.state = FeederState::Opening;
        clock.sleep(self.motion.dwell);
        Ok(())
    }

    /// `Opening -> Closing`: swing back and wait for the gate to settle.
    pub fn close(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<(), ActuatorError> {
        self.expect(FeederState::Opening)?;
        self.drive(hw, angle_to_duty(self.motion.closed_angle_deg))?;
        self.state = FeederState::Closing;
        clock.sleep(self.motion.settle);
        Ok(())
    }

    /// `Closing -> Idle`: drop the drive signal.
    pub fn release(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError> {
        self.expect(FeederState::Closing)?;
        self.drive(hw, NEUTRAL_DUTY)?;
        self.state = FeederState::Idle;
        Ok(())
    }

    pub fn state(&self) -> FeederState {
        self.state
    }

    /// Last duty cycle written, in percent.
    pub fn duty(&self) -> f32 {
        self.duty
    }

    fn expect(&self, state: FeederState) -> Result<(), ActuatorError> {
        if self.state == state {
            Ok(())
        } else {
            Err(ActuatorError::InvalidTransition)
        }
    }

    fn drive(&mut self, hw: &mut impl HardwarePort, duty: f32) -> Result<(), ActuatorError> {
        let pwm = self.pwm.ok_or(HwError::NotConfigured(self.pin))?;
        hw.set_duty_cycle(pwm, duty)?;
        self.duty = duty;
        Ok(())
    }
}

impl Actuator for FeederActuator {
    fn name(&self) -> &'static str {
        "feeder"
    }

    fn mode(&self) -> ActuatorState {
        ActuatorState::Feeder(self.state)
    }

    /// Claim the servo PWM channel and leave it unpowered.
    fn configure(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError> {
        let pwm = hw.configure_pwm(self.pin, self.frequency_hz)?;
        self.pwm = Some(pwm);
        hw.set_duty_cycle(pwm, NEUTRAL_DUTY)?;
        self.duty = NEUTRAL_DUTY;
        self.state = FeederState::Idle;
        Ok(())
    }

    /// Best-effort de-energise from any state.  The servo is recorded as
    /// neutral and `Idle` even if the write fails.
    fn neutralize(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError> {
        let result = match self.pwm {
            Some(pwm) => hw.set_duty_cycle(pwm, NEUTRAL_DUTY).map_err(ActuatorError::from),
            None => Ok(()),
        };
        self.duty = NEUTRAL_DUTY;
        self.state = FeederState::Idle;
        result
    }
}

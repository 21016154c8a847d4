//! Top-up pump relay driver.
//!
//! The pump is driven from the water-level verdict alone:
//!
//! | Level verdict | Next state                               |
//! |---------------|------------------------------------------|
//! | `Below`       | On (low water, fill)                     |
//! | `Above`       | Off                                      |
//! | `Normal`      | unchanged ([`HoldPolicy::Hold`]) or Off  |
//! | unknown       | Off                                      |
//!
//! ## Safety contract
//!
//! Any failed relay write is treated as fatal for the cycle: the driver
//! makes one attempt to de-energise the relay and records the pump as Off
//! regardless of what the hardware reports.

use core::fmt;

use log::{error, info};
use serde::{Deserialize, Serialize};

use super::{Actuator, ActuatorState};
use crate::app::ports::{HardwarePort, Level};
use crate::error::ActuatorError;
use crate::threshold::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Off,
    On,
}

impl fmt::Display for PumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "OFF"),
            Self::On => write!(f, "ON"),
        }
    }
}

/// What an in-band level does to the pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPolicy {
    /// Keep the current state (hysteresis between the band edges).
    #[default]
    Hold,
    /// Switch off as soon as the level is back in band.
    ForceOff,
}

/// Pure transition function.  `None` means the level is unknown.
pub fn next_state(verdict: Option<Verdict>, current: PumpState, policy: HoldPolicy) -> PumpState {
    match (verdict, policy) {
        (Some(Verdict::Below), _) => PumpState::On,
        (Some(Verdict::Above), _) | (None, _) => PumpState::Off,
        (Some(Verdict::Normal), HoldPolicy::Hold) => current,
        (Some(Verdict::Normal), HoldPolicy::ForceOff) => PumpState::Off,
    }
}

pub struct PumpActuator {
    pin: u8,
    policy: HoldPolicy,
    state: PumpState,
}

impl PumpActuator {
    pub fn new(pin: u8, policy: HoldPolicy) -> Self {
        Self {
            pin,
            policy,
            state: PumpState::Off,
        }
    }

    /// Drive the relay from this cycle's level verdict.
    ///
    /// Returns `Some(new_state)` when the state changed.
    pub fn apply(
        &mut self,
        verdict: Option<Verdict>,
        hw: &mut impl HardwarePort,
    ) -> Result<Option<PumpState>, ActuatorError> {
        let target = next_state(verdict, self.state, self.policy);
        self.set(target, hw)
    }

    /// Switch off unconditionally (emergency stop, shutdown).
    pub fn force_off(
        &mut self,
        hw: &mut impl HardwarePort,
    ) -> Result<Option<PumpState>, ActuatorError> {
        self.set(PumpState::Off, hw)
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    fn set(
        &mut self,
        target: PumpState,
        hw: &mut impl HardwarePort,
    ) -> Result<Option<PumpState>, ActuatorError> {
        if target == self.state {
            return Ok(None);
        }
        let level = Level::from(target == PumpState::On);
        if let Err(e) = hw.set_digital(self.pin, level) {
            error!("Pump: relay write failed ({}), forcing OFF", e);
            let _ = hw.set_digital(self.pin, Level::Low);
            self.state = PumpState::Off;
            return Err(e.into());
        }
        info!("Pump: {} -> {}", self.state, target);
        self.state = target;
        Ok(Some(target))
    }
}

impl Actuator for PumpActuator {
    fn name(&self) -> &'static str {
        "pump"
    }

    fn mode(&self) -> ActuatorState {
        ActuatorState::Pump(self.state)
    }

    fn configure(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError> {
        hw.configure_output(self.pin)?;
        hw.set_digital(self.pin, Level::Low)?;
        self.state = PumpState::Off;
        Ok(())
    }

    fn neutralize(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError> {
        self.force_off(hw).map(|_| ())
    }
}

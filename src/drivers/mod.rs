//! Actuator drivers, hardware initialisation, and peripheral helpers.
//!
//! Drivers talk to the board only through [`HardwarePort`], so the same
//! code runs against the ESP-IDF adapter, the host simulator, and test
//! doubles.

pub mod feeder;
pub mod hw_init;
pub mod onewire;
pub mod pump;
pub mod status_led;
pub mod watchdog;

use crate::app::ports::HardwarePort;
use crate::error::ActuatorError;

use feeder::FeederState;
use pump::PumpState;

/// Observable mode of one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Pump(PumpState),
    Feeder(FeederState),
}

/// Capability shared by every controllable output.
pub trait Actuator {
    fn name(&self) -> &'static str;

    fn mode(&self) -> ActuatorState;

    /// Claim the output and leave it de-energised.
    fn configure(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError>;

    /// Drive to the de-energised safe state.  The driver records the safe
    /// state even when the hardware rejects the command.
    fn neutralize(&mut self, hw: &mut impl HardwarePort) -> Result<(), ActuatorError>;
}

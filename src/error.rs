//! Unified error types for the aquamon controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the loop and the safety supervisor without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// The hardware collaborator rejected a call outside sensor/actuator use
    /// (pin claims, bus release).
    Hardware(HwError),
    /// A safety latch blocked the operation.
    Safety(SafetyFault),
    /// Operator requested a stop.
    Interrupted,
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
            Self::Interrupted => write!(f, "interrupt requested"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware port errors
// ---------------------------------------------------------------------------

/// Raw failure reported by the [`HardwarePort`](crate::app::ports::HardwarePort).
///
/// Sensors and actuators translate these into their own variants so the
/// loop can apply the right recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// No device answered on the bus (1-Wire presence pulse missing).
    NoDevice,
    /// The device answered but the transfer failed (CRC, timeout).
    BusFault,
    /// The peripheral did not acknowledge a write.
    NotAcknowledged,
    /// Pin or channel was never configured.
    NotConfigured(u8),
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => write!(f, "no device responding"),
            Self::BusFault => write!(f, "bus transfer failed"),
            Self::NotAcknowledged => write!(f, "command not acknowledged"),
            Self::NotConfigured(pin) => write!(f, "pin {pin} not configured"),
        }
    }
}

impl From<HwError> for Error {
    fn from(e: HwError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus or device not responding.
    Unavailable,
    /// Raw value outside the expected device range.  Readers clamp instead
    /// of returning this; it exists so the condition can be reported.
    OutOfRangeRaw,
    /// The device answered but the transfer was corrupt.
    BusFault,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "sensor unavailable"),
            Self::OutOfRangeRaw => write!(f, "raw reading out of range"),
            Self::BusFault => write!(f, "sensor bus fault"),
        }
    }
}

impl From<HwError> for SensorError {
    fn from(e: HwError) -> Self {
        match e {
            HwError::BusFault => Self::BusFault,
            HwError::NoDevice | HwError::NotAcknowledged | HwError::NotConfigured(_) => {
                Self::Unavailable
            }
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Hardware did not acknowledge the command.
    CommandFailed,
    /// A feeder step was requested from the wrong state.
    InvalidTransition,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed => write!(f, "command failed"),
            Self::InvalidTransition => write!(f, "invalid state transition"),
        }
    }
}

impl From<HwError> for ActuatorError {
    fn from(_: HwError) -> Self {
        Self::CommandFailed
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Conditions latched by the [`SafetySupervisor`](crate::safety::SafetySupervisor).
/// Each variant is one bit so several can be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Operator engaged the emergency stop.
    EmergencyStop = 0b0000_0001,
    /// The pump relay did not take its last command.
    PumpCommandFailed = 0b0000_0010,
    /// The feeder servo did not take its last command.
    FeederCommandFailed = 0b0000_0100,
    /// An indicator LED did not take its last command.
    DisplayCommandFailed = 0b0000_1000,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmergencyStop => write!(f, "emergency stop"),
            Self::PumpCommandFailed => write!(f, "pump command failed"),
            Self::FeederCommandFailed => write!(f, "feeder command failed"),
            Self::DisplayCommandFailed => write!(f, "indicator command failed"),
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

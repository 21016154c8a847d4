//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial console today).  Nothing
//! emitted here feeds back into control decisions.

use crate::alert::AlertState;
use crate::drivers::feeder::FeederState;
use crate::drivers::pump::PumpState;
use crate::error::ActuatorError;
use crate::scheduler::TimeOfDay;
use crate::sensors::{SensorKind, SensorSnapshot};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Peripherals configured; the loop is about to start.
    Started {
        sensors: usize,
        pump: bool,
        feeder: bool,
    },

    /// End-of-iteration status, once per cycle.
    Cycle(CycleStatus),

    /// A probe stopped delivering fresh readings.  `holding` is true while
    /// the last good value still stands in.
    SensorDegraded { kind: SensorKind, holding: bool },

    /// A degraded probe delivered a fresh reading again.
    SensorRecovered { kind: SensorKind },

    /// Aggregate went from ok to alert.
    AlertRaised(AlertState),

    /// Aggregate went from alert to ok.
    AlertCleared,

    PumpChanged(PumpState),

    FeedStarted { at: TimeOfDay, manual: bool },

    /// `next` is the following scheduled feeding, if any.
    FeedCompleted {
        at: TimeOfDay,
        next: Option<TimeOfDay>,
    },

    FeedSkipped { at: TimeOfDay, reason: &'static str },

    /// An actuator rejected a command and was driven to its safe state.
    ActuatorFault {
        actuator: &'static str,
        error: ActuatorError,
    },

    /// Emergency-stop latch changed.
    EmergencyStop { engaged: bool },

    /// Outputs neutralised and hardware released.
    Shutdown,
}

/// Point-in-time view of one iteration.
#[derive(Debug, Clone)]
pub struct CycleStatus {
    pub cycle: u64,
    pub at: TimeOfDay,
    pub readings: SensorSnapshot,
    pub alert: AlertState,
    pub pump: Option<PumpState>,
    pub feeder: Option<FeederState>,
    /// Safety fault bitmask (0 = none).
    pub faults: u8,
}

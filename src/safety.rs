//! Safety supervisor.
//!
//! Holds a fault bitmask that the control loop consults before commanding
//! any actuator.  Two kinds of fault live here:
//!
//! - **Emergency stop**: latched by an operator command and held until an
//!   explicit clear.  While set, the pump is held off and feedings are
//!   skipped; sensing and the LED display keep running.
//! - **Command failures**: set when an actuator rejected its last command
//!   and cleared by the next successful command to that actuator.
//!
//! Several faults can be active at once.  Every set/clear edge is logged
//! exactly once.

use log::{error, info};

use crate::error::SafetyFault;

#[derive(Debug, Default)]
pub struct SafetySupervisor {
    faults: u8,
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage_emergency_stop(&mut self) {
        self.eval_fault(SafetyFault::EmergencyStop, true);
    }

    pub fn clear_emergency_stop(&mut self) {
        self.eval_fault(SafetyFault::EmergencyStop, false);
    }

    /// Record the outcome of the last command to one actuator.
    pub fn record_command(&mut self, fault: SafetyFault, ok: bool) {
        self.eval_fault(fault, !ok);
    }

    /// True while actuators may be energised.
    pub fn actuation_allowed(&self) -> bool {
        !self.has_fault(SafetyFault::EmergencyStop)
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}

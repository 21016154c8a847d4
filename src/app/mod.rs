//! Application core: pure domain logic, no direct I/O.
//!
//! The business rules of the controller live here: the per-cycle
//! read → evaluate → aggregate → display → actuate pipeline, operator
//! commands, and orderly shutdown.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

#[cfg(test)]
pub(crate) mod fake;

//! Aquamon enclosure controller library.
//!
//! Exposes the control core, its port traits and the adapters for
//! integration testing and for the firmware binary.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod alert;
pub mod app;
pub mod cancel;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod threshold;

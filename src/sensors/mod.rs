//! Sensor subsystem: individual probes and the aggregating [`SensorHub`].
//!
//! The hub owns every configured probe and produces a [`SensorSnapshot`]
//! once per control cycle.  All reads for a cycle complete before the
//! snapshot is returned, so verdicts are always computed from one
//! consistent set of samples.

pub mod ph;
pub mod temperature;
pub mod water_level;

use core::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ClockPort, HardwarePort};
use crate::error::SensorError;
use ph::PhProbe;
use temperature::TemperatureProbe;
use water_level::LevelProbe;

/// Upper bound on simultaneously configured probes.
pub const MAX_SENSORS: usize = 3;

// ---------------------------------------------------------------------------
// Sample types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Ph,
    Level,
}

impl SensorKind {
    pub const ALL: [Self; MAX_SENSORS] = [Self::Temperature, Self::Ph, Self::Level];

    /// Engineering unit suffix for status lines.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "\u{00b0}C",
            Self::Ph => "",
            Self::Level => "%",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Ph => write!(f, "pH"),
            Self::Level => write!(f, "level"),
        }
    }
}

/// One converted reading.  Lives for a single cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub kind: SensorKind,
    /// Device-native count (ADC code or DS18B20 register).
    pub raw: u16,
    /// Engineering units (°C, pH, % full).
    pub value: f32,
}

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f32, decimals: i32) -> f32 {
    let scale = 10f32.powi(decimals);
    (value * scale).round() / scale
}

/// Clamp an ADC code to `device_max`, warning once per occurrence.
pub(crate) fn clamp_adc(kind: SensorKind, raw: u16, device_max: u16) -> u16 {
    if raw > device_max {
        warn!(
            "{}: raw {} above device max {} ({}), clamping",
            kind,
            raw,
            device_max,
            SensorError::OutOfRangeRaw
        );
        device_max
    } else {
        raw
    }
}

// ---------------------------------------------------------------------------
// Reader capability
// ---------------------------------------------------------------------------

/// A probe that can fetch a raw device sample and convert it.
pub trait SensorReader {
    fn kind(&self) -> SensorKind;

    /// Blocking read.  May sleep on `clock` for a conversion to settle.
    fn read_raw(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<u16, SensorError>;

    /// Fixed linear transform from device counts to engineering units.
    fn to_engineering_units(&self, raw: u16) -> f32;

    /// Read and convert in one step.
    fn sample(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<SensorSample, SensorError> {
        let raw = self.read_raw(hw, clock)?;
        Ok(SensorSample {
            kind: self.kind(),
            raw,
            value: self.to_engineering_units(raw),
        })
    }
}

/// Closed set of probe variants the hub can own.
#[derive(Debug, Clone)]
pub enum Probe {
    Temperature(TemperatureProbe),
    Ph(PhProbe),
    Level(LevelProbe),
}

impl SensorReader for Probe {
    fn kind(&self) -> SensorKind {
        match self {
            Self::Temperature(p) => p.kind(),
            Self::Ph(p) => p.kind(),
            Self::Level(p) => p.kind(),
        }
    }

    fn read_raw(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<u16, SensorError> {
        match self {
            Self::Temperature(p) => p.read_raw(hw, clock),
            Self::Ph(p) => p.read_raw(hw, clock),
            Self::Level(p) => p.read_raw(hw, clock),
        }
    }

    fn to_engineering_units(&self, raw: u16) -> f32 {
        match self {
            Self::Temperature(p) => p.to_engineering_units(raw),
            Self::Ph(p) => p.to_engineering_units(raw),
            Self::Level(p) => p.to_engineering_units(raw),
        }
    }

    fn sample(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> Result<SensorSample, SensorError> {
        match self {
            Self::Temperature(p) => p.sample(hw, clock),
            Self::Ph(p) => p.sample(hw, clock),
            Self::Level(p) => p.sample(hw, clock),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Outcome of reading one probe this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub kind: SensorKind,
    /// `None` when the probe failed and no substitute is allowed.
    pub sample: Option<SensorSample>,
    /// True when `sample` is the previous good reading standing in for a
    /// failed read.
    pub stale: bool,
}

/// Every configured probe's reading for one cycle.
#[derive(Debug, Clone, Default)]
pub struct SensorSnapshot {
    readings: heapless::Vec<Reading, MAX_SENSORS>,
}

impl SensorSnapshot {
    pub fn get(&self, kind: SensorKind) -> Option<&Reading> {
        self.readings.iter().find(|r| r.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Collects at most [`MAX_SENSORS`] readings; extras are dropped.
impl FromIterator<Reading> for SensorSnapshot {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        let mut readings = heapless::Vec::new();
        for r in iter.into_iter().take(MAX_SENSORS) {
            let _ = readings.push(r);
        }
        Self { readings }
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ProbeSlot {
    probe: Probe,
    last_good: Option<SensorSample>,
    consecutive_failures: u32,
}

/// Aggregates all probes and produces a unified snapshot.
pub struct SensorHub {
    slots: heapless::Vec<ProbeSlot, MAX_SENSORS>,
    /// How many consecutive failed reads may be covered by the last good
    /// sample before the reading is reported as unknown.
    stale_limit: u32,
}

impl SensorHub {
    pub fn new(stale_limit: u32) -> Self {
        Self {
            slots: heapless::Vec::new(),
            stale_limit,
        }
    }

    /// Register a probe.  Returns the probe back if the hub is full.
    pub fn add(&mut self, probe: Probe) -> Result<(), Probe> {
        self.slots
            .push(ProbeSlot {
                probe,
                last_good: None,
                consecutive_failures: 0,
            })
            .map_err(|slot| slot.probe)
    }

    pub fn kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        self.slots.iter().map(|s| s.probe.kind())
    }

    /// Read every probe and return a unified snapshot.
    ///
    /// Individual read failures are logged and the previous good value is
    /// retained for up to `stale_limit` cycles; after that the reading is
    /// reported without a sample so the verdict becomes unknown.  A single
    /// flaky probe must not crash the control loop.
    pub fn read_all(
        &mut self,
        hw: &mut impl HardwarePort,
        clock: &mut impl ClockPort,
    ) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::default();
        for slot in &mut self.slots {
            let kind = slot.probe.kind();
            let reading = match slot.probe.sample(hw, clock) {
                Ok(sample) => {
                    if slot.consecutive_failures > 0 {
                        info!(
                            "{}: recovered after {} failed read(s)",
                            kind, slot.consecutive_failures
                        );
                    }
                    slot.consecutive_failures = 0;
                    slot.last_good = Some(sample);
                    Reading {
                        kind,
                        sample: Some(sample),
                        stale: false,
                    }
                }
                Err(e) => {
                    slot.consecutive_failures = slot.consecutive_failures.saturating_add(1);
                    let substitute = slot
                        .last_good
                        .filter(|_| slot.consecutive_failures <= self.stale_limit);
                    match substitute {
                        Some(prev) => warn!(
                            "{}: {} (failure {}), holding last reading {:.2}",
                            kind, e, slot.consecutive_failures, prev.value
                        ),
                        None => warn!(
                            "{}: {} (failure {}), reading unknown",
                            kind, e, slot.consecutive_failures
                        ),
                    }
                    Reading {
                        kind,
                        sample: substitute,
                        stale: substitute.is_some(),
                    }
                }
            };
            // Capacity equals slot capacity, so this cannot overflow.
            let _ = snapshot.readings.push(reading);
        }
        snapshot
    }
}

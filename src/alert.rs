//! Alert aggregation and the two-LED display.
//!
//! Each cycle the per-sensor verdicts are folded into one boolean: the
//! system is in alert when **any** sensor is outside its band or has no
//! usable reading.  An unknown reading never counts as normal.
//!
//! ```text
//!   {temperature: ABOVE, pH: NORMAL, level: NORMAL} ─▶ alert  (red on, green off)
//!   {temperature: NORMAL, pH: NORMAL, level: ?}     ─▶ alert
//!   {all NORMAL}                                    ─▶ ok     (green on, red off)
//! ```

use log::{info, warn};

use crate::app::ports::HardwarePort;
use crate::drivers::status_led::StatusLeds;
use crate::error::HwError;
use crate::sensors::{MAX_SENSORS, SensorKind};
use crate::threshold::Verdict;

/// Verdict per configured sensor.  `None` marks a sensor whose reading is
/// unknown this cycle.
pub type VerdictMap = heapless::LinearMap<SensorKind, Option<Verdict>, MAX_SENSORS>;

/// Result of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertState {
    pub aggregate: bool,
    pub per_sensor: VerdictMap,
}

impl AlertState {
    pub fn alert_led(&self) -> bool {
        self.aggregate
    }

    pub fn ok_led(&self) -> bool {
        !self.aggregate
    }

    /// Sensors contributing to the alert, in map order.
    pub fn offending(&self) -> impl Iterator<Item = (SensorKind, Option<Verdict>)> + '_ {
        self.per_sensor
            .iter()
            .filter(|(_, v)| !v.is_some_and(Verdict::is_normal))
            .map(|(k, v)| (*k, *v))
    }
}

/// Edge reported by [`AlertAggregator::drive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEdge {
    Raised,
    Cleared,
}

/// Folds verdicts and owns the indicator LEDs.
pub struct AlertAggregator {
    leds: StatusLeds,
    previous: Option<bool>,
}

impl AlertAggregator {
    pub fn new(leds: StatusLeds) -> Self {
        Self {
            leds,
            previous: None,
        }
    }

    /// Pure fold: alert iff any entry is not `Some(Normal)`.
    pub fn combine(verdicts: &VerdictMap) -> AlertState {
        let aggregate = verdicts.values().any(|v| !v.is_some_and(Verdict::is_normal));
        AlertState {
            aggregate,
            per_sensor: verdicts.clone(),
        }
    }

    pub fn configure(&mut self, hw: &mut impl HardwarePort) -> Result<(), HwError> {
        self.leds.configure(hw)?;
        self.previous = None;
        Ok(())
    }

    /// Show `state` on the LEDs and report a change of aggregate.
    ///
    /// The first call after configuration reports `Raised` only when the
    /// system starts in alert.
    pub fn drive(
        &mut self,
        state: &AlertState,
        hw: &mut impl HardwarePort,
    ) -> Result<Option<AlertEdge>, HwError> {
        self.leds.show(state.aggregate, hw)?;
        let edge = match (self.previous, state.aggregate) {
            (Some(false) | None, true) => Some(AlertEdge::Raised),
            (Some(true), false) => Some(AlertEdge::Cleared),
            _ => None,
        };
        match edge {
            Some(AlertEdge::Raised) => {
                for (kind, verdict) in state.offending() {
                    match verdict {
                        Some(v) => warn!("ALERT: {} {}", kind, v),
                        None => warn!("ALERT: {} reading unknown", kind),
                    }
                }
            }
            Some(AlertEdge::Cleared) => info!("ALERT cleared: all sensors normal"),
            None => {}
        }
        self.previous = Some(state.aggregate);
        Ok(edge)
    }

    /// Darken both LEDs (shutdown).
    pub fn off(&mut self, hw: &mut impl HardwarePort) -> Result<(), HwError> {
        self.previous = None;
        self.leds.off(hw)
    }
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the board, stderr on the host).  The
//! per-cycle status line is the operator's console view:
//!
//! ```text
//! CYCLE 42 | 08:00 | temperature=36.00°C HIGH | pH=7.02 NORMAL | level=50.0% NORMAL | ALERT | pump=- | feeder=- | faults=0b00000000
//! ```
//!
//! A trailing `*` marks a held (stale) reading; `--` marks an unknown one.

use core::fmt::Write as _;

use log::{error, info, warn};

use crate::alert::AlertState;
use crate::app::events::{AppEvent, CycleStatus};
use crate::app::ports::EventSink;
use crate::sensors::{Reading, SensorKind};
use crate::threshold::Verdict;

/// Operator-facing name for where a reading sits relative to its band.
pub fn zone_label(kind: SensorKind, verdict: Option<Verdict>) -> &'static str {
    match (kind, verdict) {
        (_, None) => "UNKNOWN",
        (_, Some(Verdict::Normal)) => "NORMAL",
        (SensorKind::Ph, Some(Verdict::Below)) => "ACIDIC",
        (SensorKind::Ph, Some(Verdict::Above)) => "ALKALINE",
        (_, Some(Verdict::Below)) => "LOW",
        (_, Some(Verdict::Above)) => "HIGH",
    }
}

fn write_reading(line: &mut String, r: &Reading, alert: &AlertState) {
    let verdict = alert.per_sensor.get(&r.kind).copied().flatten();
    let _ = match r.sample {
        Some(s) => {
            let decimals = if r.kind == SensorKind::Level { 1 } else { 2 };
            write!(
                line,
                " | {}={:.*}{}{} {}",
                r.kind,
                decimals,
                s.value,
                r.kind.unit(),
                if r.stale { "*" } else { "" },
                zone_label(r.kind, verdict)
            )
        }
        None => write!(line, " | {}=-- {}", r.kind, zone_label(r.kind, verdict)),
    };
}

/// One line per cycle.
pub fn status_line(status: &CycleStatus) -> String {
    let mut line = format!("CYCLE {} | {}", status.cycle, status.at);
    for r in status.readings.iter() {
        write_reading(&mut line, r, &status.alert);
    }
    let _ = write!(
        line,
        " | {} | pump={} | feeder={} | faults=0b{:08b}",
        if status.alert.aggregate { "ALERT" } else { "OK" },
        status.pump.map_or_else(|| "-".to_owned(), |p| p.to_string()),
        status.feeder.map_or_else(|| "-".to_owned(), |f| f.to_string()),
        status.faults
    );
    line
}

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                sensors,
                pump,
                feeder,
            } => {
                info!(
                    "START | sensors={} pump={} feeder={}",
                    sensors, pump, feeder
                );
            }
            AppEvent::Cycle(status) => info!("{}", status_line(status)),
            AppEvent::SensorDegraded { kind, holding } => {
                if *holding {
                    warn!("SENSOR | {} degraded, holding last reading", kind);
                } else {
                    warn!("SENSOR | {} unavailable, reading unknown", kind);
                }
            }
            AppEvent::SensorRecovered { kind } => info!("SENSOR | {} recovered", kind),
            AppEvent::AlertRaised(state) => {
                let mut line = String::from("ALERT | raised:");
                for (kind, verdict) in state.offending() {
                    let _ = write!(line, " {}={}", kind, zone_label(kind, verdict));
                }
                warn!("{}", line);
            }
            AppEvent::AlertCleared => info!("ALERT | cleared"),
            AppEvent::PumpChanged(state) => info!("PUMP | {}", state),
            AppEvent::FeedStarted { at, manual } => {
                info!(
                    "FEED | {} started ({})",
                    at,
                    if *manual { "manual" } else { "scheduled" }
                );
            }
            AppEvent::FeedCompleted { at, next: Some(next) } => {
                info!("FEED | {} done, next {}", at, next)
            }
            AppEvent::FeedCompleted { at, next: None } => info!("FEED | {} done", at),
            AppEvent::FeedSkipped { at, reason } => warn!("FEED | {} skipped: {}", at, reason),
            AppEvent::ActuatorFault { actuator, error: e } => {
                error!("FAULT | {}: {}", actuator, e);
            }
            AppEvent::EmergencyStop { engaged } => {
                if *engaged {
                    warn!("ESTOP | engaged");
                } else {
                    info!("ESTOP | cleared");
                }
            }
            AppEvent::Shutdown => info!("STOP | outputs neutralised"),
        }
    }
}

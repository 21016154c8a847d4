//! Control loop service: the hexagonal core.
//!
//! [`ControlLoop`] owns the sensor hub, alert display, actuators, schedule
//! gate and safety supervisor.  All I/O flows through the port traits it
//! is constructed with, making the whole service testable with mock
//! adapters.
//!
//! ```text
//!  HardwarePort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                   │         ControlLoop          │
//!  ClockPort    ──▶ │ read → evaluate → aggregate  │
//!                   │ → display → actuate → sleep  │
//!                   └──────────────────────────────┘
//! ```
//!
//! ## Ordering
//!
//! Every probe is read before any verdict is computed, and exactly one
//! aggregate decision is applied per iteration.  A feeding sequence blocks
//! the iteration that triggered it; no sensing happens meanwhile.
//!
//! ## Shutdown
//!
//! [`ControlLoop::shutdown`] neutralises every output and releases the
//! hardware.  It runs when the loop observes the cancel token and again
//! from `Drop`, so an early return or a panic unwinding through the owner
//! cannot leave an actuator energised.  It is idempotent.

use core::time::Duration;

use log::{error, info, warn};

use crate::alert::{AlertAggregator, AlertEdge, AlertState, VerdictMap};
use crate::cancel::CancelToken;
use crate::config::SystemConfig;
use crate::drivers::Actuator;
use crate::drivers::feeder::{FeedOutcome, FeederActuator, FeederMotion, FeederState};
use crate::drivers::pump::{PumpActuator, PumpState};
use crate::drivers::status_led::StatusLeds;
use crate::error::{Error, SafetyFault};
use crate::pins;
use crate::safety::SafetySupervisor;
use crate::scheduler::{ScheduleGate, TimeOfDay};
use crate::sensors::ph::PhProbe;
use crate::sensors::temperature::TemperatureProbe;
use crate::sensors::water_level::LevelProbe;
use crate::sensors::{MAX_SENSORS, Probe, SensorHub, SensorKind, SensorSnapshot};
use crate::threshold::evaluate;

use super::commands::AppCommand;
use super::events::{AppEvent, CycleStatus};
use super::ports::{ClockPort, EventSink, HardwarePort};

/// Granularity of the cancellable inter-cycle sleep.
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Classify every reading in `snapshot` against its configured band.
/// Readings without a sample map to `None` (unknown).
pub fn verdicts(snapshot: &SensorSnapshot, config: &SystemConfig) -> VerdictMap {
    let mut map = VerdictMap::new();
    for r in snapshot.iter() {
        let band = &config.sensors.get(r.kind).band;
        // One entry per kind, at most MAX_SENSORS kinds.
        let _ = map.insert(r.kind, r.sample.map(|s| evaluate(s.value, band)));
    }
    map
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Health {
    Fresh,
    Holding,
    Unknown,
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<'a, H: HardwarePort, C: ClockPort, S: EventSink> {
    config: &'a SystemConfig,
    hw: H,
    clock: C,
    sink: S,
    sensors: SensorHub,
    alerts: AlertAggregator,
    pump: Option<PumpActuator>,
    feeder: Option<FeederActuator>,
    gate: Option<ScheduleGate>,
    safety: SafetySupervisor,
    health: heapless::LinearMap<SensorKind, Health, MAX_SENSORS>,
    cycles: u64,
    shut_down: bool,
}

impl<'a, H: HardwarePort, C: ClockPort, S: EventSink> ControlLoop<'a, H, C, S> {
    /// Validate `config`, build every configured probe and actuator, and
    /// claim their pins.
    ///
    /// If any claim fails the partially built loop is dropped, which runs
    /// the shutdown path and releases whatever was already claimed.
    pub fn new(config: &'a SystemConfig, hw: H, clock: C, sink: S) -> Result<Self, Error> {
        config.validate()?;

        let full_scale = pins::ADC_DEVICE_MAX;
        let mut sensors = SensorHub::new(config.stale_limit);
        for (kind, sc) in config.sensors.enabled() {
            let probe = match kind {
                SensorKind::Temperature => Probe::Temperature(TemperatureProbe::new(
                    sc.channel,
                    config.temperature_settle(),
                )),
                SensorKind::Ph => Probe::Ph(PhProbe::new(sc.channel, full_scale)),
                SensorKind::Level => Probe::Level(LevelProbe::new(sc.channel, full_scale)),
            };
            sensors
                .add(probe)
                .map_err(|_| Error::Config("too many sensors"))?;
        }

        let pump = config
            .pump
            .map(|p| PumpActuator::new(p.pin, p.hold_policy));
        let (feeder, gate) = match &config.feeder {
            Some(f) => {
                let motion = FeederMotion {
                    open_angle_deg: f.open_angle_deg,
                    closed_angle_deg: f.closed_angle_deg,
                    dwell: f.dwell(),
                    settle: f.settle(),
                };
                (
                    Some(FeederActuator::new(f.pin, f.pwm_frequency_hz, motion)),
                    Some(ScheduleGate::new(f.schedule.clone())),
                )
            }
            None => (None, None),
        };

        let mut lp = Self {
            config,
            hw,
            clock,
            sink,
            sensors,
            alerts: AlertAggregator::new(StatusLeds::new(
                config.leds.alert_pin,
                config.leds.ok_pin,
            )),
            pump,
            feeder,
            gate,
            safety: SafetySupervisor::new(),
            health: heapless::LinearMap::new(),
            cycles: 0,
            shut_down: false,
        };
        lp.configure()?;

        let sensors = lp.sensors.kinds().count();
        info!(
            "ControlLoop ready: {} sensor(s), pump={}, feeder={}, every {} ms",
            sensors,
            lp.pump.is_some(),
            lp.feeder.is_some(),
            config.poll_interval_ms
        );
        if let Some(gate) = &lp.gate {
            let schedule = gate.schedule();
            match schedule.next_after(lp.clock.now()) {
                Some(next) => info!("Feeding schedule: {} (next {})", schedule, next),
                None => info!("Feeding schedule: {}", schedule),
            }
        }
        let started = AppEvent::Started {
            sensors,
            pump: lp.pump.is_some(),
            feeder: lp.feeder.is_some(),
        };
        lp.sink.emit(&started);
        Ok(lp)
    }

    fn configure(&mut self) -> Result<(), Error> {
        self.alerts.configure(&mut self.hw).map_err(|e| {
            error!("Indicator LED setup failed: {}", e);
            Error::Init("indicator LEDs")
        })?;
        if let Some(pump) = self.pump.as_mut() {
            pump.configure(&mut self.hw).map_err(|e| {
                error!("Pump relay setup failed: {}", e);
                Error::Init("pump relay")
            })?;
        }
        if let Some(feeder) = self.feeder.as_mut() {
            feeder.configure(&mut self.hw).map_err(|e| {
                error!("Feeder servo setup failed: {}", e);
                Error::Init("feeder servo")
            })?;
        }
        Ok(())
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full iteration: read → evaluate → aggregate → display →
    /// actuate.  Does not sleep.
    ///
    /// Fails with [`Error::Interrupted`] once the loop has been shut down.
    pub fn cycle(&mut self) -> Result<CycleStatus, Error> {
        if self.shut_down {
            return Err(Error::Interrupted);
        }

        // 1. Read every probe into one snapshot.
        let snapshot = self.sensors.read_all(&mut self.hw, &mut self.clock);
        self.track_health(&snapshot);

        // 2. Evaluate and aggregate.
        let per_sensor = verdicts(&snapshot, self.config);
        let alert = AlertAggregator::combine(&per_sensor);

        // 3. Display, then actuators.
        self.display(&alert);
        self.drive_pump(&per_sensor);
        let now = self.clock.now();
        self.poll_schedule(now);

        self.cycles += 1;
        let status = CycleStatus {
            cycle: self.cycles,
            at: now,
            readings: snapshot,
            alert,
            pump: self.pump.as_ref().map(PumpActuator::state),
            feeder: self.feeder.as_ref().map(FeederActuator::state),
            faults: self.safety.faults(),
        };
        self.sink.emit(&AppEvent::Cycle(status.clone()));
        Ok(status)
    }

    /// Loop until `token` is cancelled, then shut down.
    pub fn run(&mut self, token: &CancelToken) {
        self.run_with(token, |_| {});
    }

    /// As [`run`](Self::run), calling `per_iteration` at the top of every
    /// iteration (watchdog feed, command intake).
    pub fn run_with(&mut self, token: &CancelToken, mut per_iteration: impl FnMut(&mut Self)) {
        info!(
            "Control loop running every {} ms",
            self.config.poll_interval_ms
        );
        while !token.is_cancelled() {
            per_iteration(self);
            if self.cycle().is_err() {
                break;
            }
            self.pause(token);
        }
        info!("Stop requested after {} cycle(s)", self.cycles);
        self.shutdown();
    }

    /// Sleep one poll interval in slices, returning early on cancel.
    fn pause(&mut self, token: &CancelToken) {
        let mut remaining = self.config.poll_interval();
        while !remaining.is_zero() && !token.is_cancelled() {
            let step = remaining.min(SLEEP_SLICE);
            self.clock.sleep(step);
            remaining -= step;
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command between cycles.
    pub fn handle_command(&mut self, cmd: AppCommand) -> Result<(), Error> {
        if self.shut_down {
            return Err(Error::Interrupted);
        }
        info!("Command: {:?}", cmd);
        match cmd {
            AppCommand::FeedNow => {
                let at = self.clock.now();
                self.feed(at, true)
            }
            AppCommand::EmergencyStop => {
                if !self.safety.actuation_allowed() {
                    return Ok(());
                }
                self.safety.engage_emergency_stop();
                self.sink.emit(&AppEvent::EmergencyStop { engaged: true });
                self.pump_off();
                Ok(())
            }
            AppCommand::ClearEmergencyStop => {
                if self.safety.actuation_allowed() {
                    return Ok(());
                }
                self.safety.clear_emergency_stop();
                self.sink.emit(&AppEvent::EmergencyStop { engaged: false });
                Ok(())
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────

    /// Neutralise every output and release the hardware.  Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Shutting down: neutralising outputs");

        if let Some(pump) = self.pump.as_mut() {
            neutralize(pump, &mut self.hw);
        }
        if let Some(feeder) = self.feeder.as_mut() {
            neutralize(feeder, &mut self.hw);
        }
        if let Err(e) = self.alerts.off(&mut self.hw) {
            warn!("Shutdown: indicator LEDs: {}", e);
        }
        if let Err(e) = self.hw.release() {
            error!("Shutdown: hardware release failed: {}", e);
        }
        self.sink.emit(&AppEvent::Shutdown);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Completed iterations since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pump_state(&self) -> Option<PumpState> {
        self.pump.as_ref().map(PumpActuator::state)
    }

    pub fn feeder_state(&self) -> Option<FeederState> {
        self.feeder.as_ref().map(FeederActuator::state)
    }

    pub fn safety(&self) -> &SafetySupervisor {
        &self.safety
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ── Internal ──────────────────────────────────────────────

    fn track_health(&mut self, snapshot: &SensorSnapshot) {
        for r in snapshot.iter() {
            let now = match (r.sample, r.stale) {
                (None, _) => Health::Unknown,
                (Some(_), true) => Health::Holding,
                (Some(_), false) => Health::Fresh,
            };
            let before = self.health.get(&r.kind).copied().unwrap_or(Health::Fresh);
            if now != before {
                let event = match now {
                    Health::Fresh => AppEvent::SensorRecovered { kind: r.kind },
                    Health::Holding => AppEvent::SensorDegraded {
                        kind: r.kind,
                        holding: true,
                    },
                    Health::Unknown => AppEvent::SensorDegraded {
                        kind: r.kind,
                        holding: false,
                    },
                };
                self.sink.emit(&event);
            }
            let _ = self.health.insert(r.kind, now);
        }
    }

    fn display(&mut self, alert: &AlertState) {
        match self.alerts.drive(alert, &mut self.hw) {
            Ok(edge) => {
                self.safety.record_command(SafetyFault::DisplayCommandFailed, true);
                let event = match edge {
                    Some(AlertEdge::Raised) => AppEvent::AlertRaised(alert.clone()),
                    Some(AlertEdge::Cleared) => AppEvent::AlertCleared,
                    None => return,
                };
                self.sink.emit(&event);
            }
            Err(e) => {
                warn!("Indicator LEDs: {}", e);
                self.safety.record_command(SafetyFault::DisplayCommandFailed, false);
                self.sink.emit(&AppEvent::ActuatorFault {
                    actuator: "indicator",
                    error: e.into(),
                });
            }
        }
    }

    fn drive_pump(&mut self, per_sensor: &VerdictMap) {
        let Some(pump) = self.pump.as_mut() else {
            return;
        };
        let before = pump.state();
        let result = if self.safety.actuation_allowed() {
            let level = per_sensor.get(&SensorKind::Level).copied().flatten();
            pump.apply(level, &mut self.hw)
        } else {
            pump.force_off(&mut self.hw)
        };
        self.safety
            .record_command(SafetyFault::PumpCommandFailed, result.is_ok());
        if let Err(error) = result {
            self.sink.emit(&AppEvent::ActuatorFault {
                actuator: pump.name(),
                error,
            });
        }
        if pump.state() != before {
            self.sink.emit(&AppEvent::PumpChanged(pump.state()));
        }
    }

    fn pump_off(&mut self) {
        let Some(pump) = self.pump.as_mut() else {
            return;
        };
        let before = pump.state();
        let result = pump.force_off(&mut self.hw);
        self.safety
            .record_command(SafetyFault::PumpCommandFailed, result.is_ok());
        if let Err(error) = result {
            self.sink.emit(&AppEvent::ActuatorFault {
                actuator: pump.name(),
                error,
            });
        }
        if pump.state() != before {
            self.sink.emit(&AppEvent::PumpChanged(pump.state()));
        }
    }

    fn poll_schedule(&mut self, now: TimeOfDay) {
        let fire = self.gate.as_mut().is_some_and(|gate| gate.poll(now));
        if fire {
            // Failures are already reported as events.
            let _ = self.feed(now, false);
        }
    }

    fn feed(&mut self, at: TimeOfDay, manual: bool) -> Result<(), Error> {
        let Some(feeder) = self.feeder.as_mut() else {
            warn!("Feed requested but no feeder is configured");
            return Err(Error::Config("no feeder configured"));
        };
        if !self.safety.actuation_allowed() {
            warn!("Feeder: {} feeding skipped (emergency stop)", at);
            self.sink.emit(&AppEvent::FeedSkipped {
                at,
                reason: "emergency stop",
            });
            return Err(SafetyFault::EmergencyStop.into());
        }

        self.sink.emit(&AppEvent::FeedStarted { at, manual });
        match feeder.trigger(&mut self.hw, &mut self.clock) {
            Ok(FeedOutcome::Completed) => {
                self.safety.record_command(SafetyFault::FeederCommandFailed, true);
                let next = self.gate.as_ref().and_then(|g| g.schedule().next_after(at));
                self.sink.emit(&AppEvent::FeedCompleted { at, next });
                Ok(())
            }
            Ok(FeedOutcome::Ignored) => {
                self.sink.emit(&AppEvent::FeedSkipped {
                    at,
                    reason: "feeder busy",
                });
                Ok(())
            }
            Err(error) => {
                self.safety.record_command(SafetyFault::FeederCommandFailed, false);
                self.sink.emit(&AppEvent::ActuatorFault {
                    actuator: feeder.name(),
                    error,
                });
                Err(error.into())
            }
        }
    }
}

fn neutralize(actuator: &mut impl Actuator, hw: &mut impl HardwarePort) {
    info!("Shutdown: {} was {:?}", actuator.name(), actuator.mode());
    if let Err(e) = actuator.neutralize(hw) {
        error!("Shutdown: {} {}", actuator.name(), e);
    }
}

impl<H: HardwarePort, C: ClockPort, S: EventSink> Drop for ControlLoop<'_, H, C, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

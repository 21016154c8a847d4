//! End-to-end tests for the ControlLoop → drivers → port pipeline.
//!
//! Each test builds a loop from a preset, injects sensor values through
//! [`MockHardware`], and asserts on pin levels, duty writes and emitted
//! events.

use aquamon::app::commands::AppCommand;
use aquamon::app::events::AppEvent;
use aquamon::app::ports::Level;
use aquamon::app::service::ControlLoop;
use aquamon::cancel::CancelToken;
use aquamon::config::SystemConfig;
use aquamon::drivers::feeder::FeederState;
use aquamon::drivers::pump::PumpState;
use aquamon::error::{Error, SafetyFault};
use aquamon::pins;
use aquamon::scheduler::TimeOfDay;
use aquamon::sensors::SensorKind;

use super::mock_hw::{MockClock, MockHardware, RecordingSink};

/// Raw ADC counts on the default 16-bit scale.
const PH_7: u16 = 39_718;
const LEVEL_15: u16 = 9_830;
const LEVEL_50: u16 = 32_768;
const LEVEL_75: u16 = 49_151;

fn healthy_board() -> MockHardware {
    let hw = MockHardware::new();
    hw.set_temperature(Some(32.0));
    hw.set_adc(pins::PH_ADC_CHANNEL, PH_7);
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_50);
    hw
}

fn build<'a>(
    config: &'a SystemConfig,
    hw: &MockHardware,
    clock: &MockClock,
    sink: &RecordingSink,
) -> ControlLoop<'a, MockHardware, MockClock, RecordingSink> {
    ControlLoop::new(config, hw.clone(), clock.clone(), sink.clone()).unwrap()
}

// ── Alert display ─────────────────────────────────────────────

#[test]
fn hot_water_lights_the_alert_led() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    hw.set_temperature(Some(36.0));
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let status = lp.cycle().unwrap();

    assert!(status.alert.aggregate);
    let temp = status.readings.get(SensorKind::Temperature).unwrap();
    assert_eq!(temp.sample.unwrap().value, 36.0);
    assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::High));
    assert_eq!(hw.output(pins::OK_LED_GPIO), Some(Level::Low));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::AlertRaised(_))), 1);
}

#[test]
fn temperature_just_past_the_band_edge_is_an_alert() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    hw.set_temperature(Some(35.01));
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let status = lp.cycle().unwrap();
    let temp = status.readings.get(SensorKind::Temperature).unwrap();
    assert_eq!(temp.sample.unwrap().value, 35.01);
    assert!(status.alert.aggregate);

    hw.set_temperature(Some(29.97));
    let status = lp.cycle().unwrap();
    assert!(status.alert.aggregate);
    assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::High));
}

#[test]
fn alert_led_is_lit_before_the_first_verdict() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::High));
    assert_eq!(hw.output(pins::OK_LED_GPIO), Some(Level::Low));

    lp.cycle().unwrap();
    assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::Low));
    assert_eq!(hw.output(pins::OK_LED_GPIO), Some(Level::High));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::AlertCleared)), 0);
}

#[test]
fn healthy_tank_lights_the_ok_led() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let status = lp.cycle().unwrap();

    assert!(!status.alert.aggregate);
    assert_eq!(status.readings.len(), 3);
    assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::Low));
    assert_eq!(hw.output(pins::OK_LED_GPIO), Some(Level::High));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::AlertRaised(_))), 0);
}

#[test]
fn alert_clears_when_temperature_returns() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    hw.set_temperature(Some(36.0));
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    lp.cycle().unwrap();
    hw.set_temperature(Some(33.0));
    lp.cycle().unwrap();

    assert_eq!(hw.output(pins::OK_LED_GPIO), Some(Level::High));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::AlertCleared)), 1);
}

// ── Stale substitution ────────────────────────────────────────

#[test]
fn failed_level_reads_hold_then_go_unknown() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    assert_eq!(lp.cycle().unwrap().pump, Some(PumpState::On));

    hw.clear_adc(pins::LEVEL_ADC_CHANNEL);
    for _ in 0..config.stale_limit {
        let status = lp.cycle().unwrap();
        let level = status.readings.get(SensorKind::Level).unwrap();
        assert!(level.stale);
        assert_eq!(level.sample.unwrap().value, 15.0);
        assert_eq!(status.pump, Some(PumpState::On));
    }

    let status = lp.cycle().unwrap();
    let level = status.readings.get(SensorKind::Level).unwrap();
    assert!(level.sample.is_none());
    assert!(status.alert.aggregate);
    assert_eq!(status.pump, Some(PumpState::Off));
    assert_eq!(hw.output(pins::PUMP_RELAY_GPIO), Some(Level::Low));
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::SensorDegraded {
                kind: SensorKind::Level,
                holding: false
            }
        )),
        1
    );

    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_50);
    lp.cycle().unwrap();
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SensorRecovered { .. })),
        1
    );
}

#[test]
fn dead_temperature_bus_is_never_normal() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    hw.set_temperature(None);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    for _ in 0..2 {
        let status = lp.cycle().unwrap();
        let temp = status.readings.get(SensorKind::Temperature).unwrap();
        assert!(temp.sample.is_none());
        assert!(!temp.stale);
        assert!(status.alert.aggregate);
        assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::High));
        assert_eq!(hw.output(pins::OK_LED_GPIO), Some(Level::Low));
    }
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::SensorDegraded {
                kind: SensorKind::Temperature,
                holding: false
            }
        )),
        1
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::AlertRaised(_))), 1);
}

#[test]
fn level_spans_the_full_port_scale() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, u16::MAX);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let status = lp.cycle().unwrap();
    let level = status.readings.get(SensorKind::Level).unwrap();
    assert_eq!(level.sample.unwrap().value, 100.0);

    // A 12-bit full-scale count is only a sliver of the 16-bit port range.
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, 4095);
    let status = lp.cycle().unwrap();
    let level = status.readings.get(SensorKind::Level).unwrap();
    assert_eq!(level.sample.unwrap().value, 6.2);
}

// ── Pump ──────────────────────────────────────────────────────

#[test]
fn low_level_starts_the_pump_in_the_same_cycle() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let status = lp.cycle().unwrap();

    assert_eq!(status.pump, Some(PumpState::On));
    assert_eq!(hw.output(pins::PUMP_RELAY_GPIO), Some(Level::High));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::PumpChanged(PumpState::On))),
        1
    );
}

#[test]
fn pump_holds_inside_the_band_and_stops_above_it() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    lp.cycle().unwrap();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_50);
    assert_eq!(lp.cycle().unwrap().pump, Some(PumpState::On));
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_75);
    assert_eq!(lp.cycle().unwrap().pump, Some(PumpState::Off));
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_50);
    assert_eq!(lp.cycle().unwrap().pump, Some(PumpState::Off));
    assert_eq!(hw.output(pins::PUMP_RELAY_GPIO), Some(Level::Low));
}

#[test]
fn rejected_relay_write_is_a_fault_and_leaves_pump_off() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);
    hw.fail_pin(pins::PUMP_RELAY_GPIO);

    let status = lp.cycle().unwrap();

    assert_eq!(status.pump, Some(PumpState::Off));
    assert!(lp.safety().has_fault(SafetyFault::PumpCommandFailed));
    assert_eq!(
        status.faults & SafetyFault::PumpCommandFailed.mask(),
        SafetyFault::PumpCommandFailed.mask()
    );
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ActuatorFault { actuator: "pump", .. })),
        1
    );
}

// ── Feeder ────────────────────────────────────────────────────

#[test]
fn scheduled_feeding_fires_once_in_its_minute() {
    let config = SystemConfig::fish_feeder();
    let hw = MockHardware::new();
    let (clock, sink) = (MockClock::at(7, 59), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    // Roughly three minutes of one-second iterations.
    let token = CancelToken::new();
    let mut iterations = 0;
    lp.run_with(&token, |_| {
        iterations += 1;
        if iterations == 180 {
            token.cancel();
        }
    });

    let eight = TimeOfDay::new(8, 0).unwrap();
    let two_pm = TimeOfDay::new(14, 0).unwrap();
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::FeedCompleted { at, next: Some(next) } if *at == eight && *next == two_pm
        )),
        1
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::FeedStarted { .. })), 1);
    let duties = hw.duties(pins::FEEDER_SERVO_GPIO);
    assert_eq!(
        duties.windows(3).filter(|w| *w == [7.5, 2.5, 0.0]).count(),
        1
    );
}

#[test]
fn manual_feed_runs_the_full_sequence() {
    let config = SystemConfig::fish_feeder();
    let hw = MockHardware::new();
    let (clock, sink) = (MockClock::at(10, 30), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    lp.handle_command(AppCommand::FeedNow).unwrap();

    assert_eq!(hw.duties(pins::FEEDER_SERVO_GPIO), [0.0, 7.5, 2.5, 0.0]);
    assert_eq!(lp.feeder_state(), Some(FeederState::Idle));
    assert_eq!(clock.slept().as_millis(), 3000);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::FeedStarted { manual: true, .. })),
        1
    );
}

#[test]
fn feed_without_feeder_is_a_config_error() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    assert!(matches!(
        lp.handle_command(AppCommand::FeedNow),
        Err(Error::Config(_))
    ));
}

#[test]
fn failed_servo_write_returns_feeder_to_idle() {
    let config = SystemConfig::fish_feeder();
    let hw = MockHardware::new();
    let (clock, sink) = (MockClock::at(10, 30), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);
    hw.fail_pin(pins::FEEDER_SERVO_GPIO);

    let err = lp.handle_command(AppCommand::FeedNow).unwrap_err();

    assert!(matches!(err, Error::Actuator(_)));
    assert_eq!(lp.feeder_state(), Some(FeederState::Idle));
    assert!(lp.safety().has_fault(SafetyFault::FeederCommandFailed));
}

// ── Emergency stop ────────────────────────────────────────────

#[test]
fn emergency_stop_holds_pump_off_until_cleared() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    lp.cycle().unwrap();
    lp.handle_command(AppCommand::EmergencyStop).unwrap();
    assert_eq!(hw.output(pins::PUMP_RELAY_GPIO), Some(Level::Low));

    let status = lp.cycle().unwrap();
    assert_eq!(status.pump, Some(PumpState::Off));
    assert!(status.alert.aggregate, "sensing continues while stopped");

    lp.handle_command(AppCommand::ClearEmergencyStop).unwrap();
    assert_eq!(lp.cycle().unwrap().pump, Some(PumpState::On));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::EmergencyStop { .. })),
        2
    );
}

#[test]
fn emergency_stop_skips_feedings() {
    let config = SystemConfig::fish_feeder();
    let hw = MockHardware::new();
    let (clock, sink) = (MockClock::at(8, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    lp.handle_command(AppCommand::EmergencyStop).unwrap();
    assert_eq!(
        lp.handle_command(AppCommand::FeedNow),
        Err(Error::Safety(SafetyFault::EmergencyStop))
    );
    lp.cycle().unwrap();

    assert_eq!(sink.count(|e| matches!(e, AppEvent::FeedSkipped { .. })), 2);
    assert!(!hw.duties(pins::FEEDER_SERVO_GPIO).contains(&7.5));
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn cancelled_token_neutralises_outputs() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let token = CancelToken::new();
    lp.run_with(&token, |lp| {
        if lp.pump_state() == Some(PumpState::On) {
            token.cancel();
        }
    });

    assert!(lp.is_shut_down());
    assert_eq!(hw.output(pins::PUMP_RELAY_GPIO), Some(Level::Low));
    assert_eq!(hw.output(pins::ALERT_LED_GPIO), Some(Level::Low));
    assert!(hw.released());
    assert!(matches!(sink.last(), Some(AppEvent::Shutdown)));
}

#[test]
fn token_cancelled_before_run_skips_every_cycle() {
    let config = SystemConfig::water_quality();
    let hw = healthy_board();
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let token = CancelToken::new();
    token.cancel();
    lp.run(&token);

    assert_eq!(lp.cycles(), 0);
    assert!(hw.released());
}

#[test]
fn dropping_the_loop_releases_hardware_once() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_15);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    {
        let mut lp = build(&config, &hw, &clock, &sink);
        lp.cycle().unwrap();
        lp.shutdown();
        assert_eq!(hw.output(pins::PUMP_RELAY_GPIO), Some(Level::Low));
    }
    assert!(hw.released());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Shutdown)), 1);
}

#[test]
fn failed_pin_claim_releases_what_was_claimed() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.reject_claim(pins::PUMP_RELAY_GPIO);
    let result = ControlLoop::new(&config, hw.clone(), MockClock::at(9, 0), RecordingSink::new());

    assert!(matches!(result, Err(Error::Init("pump relay"))));
    assert!(hw.released());
}

#[test]
fn invalid_config_is_rejected_before_touching_hardware() {
    let mut config = SystemConfig::water_quality();
    config.poll_interval_ms = 0;
    let hw = MockHardware::new();
    let result = ControlLoop::new(&config, hw.clone(), MockClock::at(9, 0), RecordingSink::new());

    assert!(matches!(result, Err(Error::Config(_))));
    assert!(hw.output(pins::ALERT_LED_GPIO).is_none());
}

#[test]
fn inter_cycle_sleep_is_one_poll_interval() {
    let config = SystemConfig::pump_station();
    let hw = MockHardware::new();
    hw.set_adc(pins::LEVEL_ADC_CHANNEL, LEVEL_50);
    let (clock, sink) = (MockClock::at(9, 0), RecordingSink::new());
    let mut lp = build(&config, &hw, &clock, &sink);

    let token = CancelToken::new();
    let mut n = 0;
    lp.run_with(&token, |_| {
        n += 1;
        if n == 5 {
            token.cancel();
        }
    });

    // Four full pauses; the fifth is cut short by the cancel.
    assert_eq!(lp.cycles(), 5);
    assert_eq!(
        clock.slept().as_millis(),
        4 * u128::from(config.poll_interval_ms)
    );
}

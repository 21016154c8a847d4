//! Default pin / channel assignments for the enclosure controller board.
//!
//! Single source of truth for the factory wiring.  [`SystemConfig`]
//! presets read these; a deployment with different wiring overrides them
//! in its config file rather than editing this module.
//!
//! [`SystemConfig`]: crate::config::SystemConfig

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DS18B20 water-temperature probe, 1-Wire data line.
pub const TEMP_ONEWIRE_GPIO: u8 = 22;

/// pH probe analog front-end.  ADC channel 0.
pub const PH_ADC_CHANNEL: u8 = 0;

/// Resistive water-level sender.  ADC channel 1.
pub const LEVEL_ADC_CHANNEL: u8 = 1;

/// Full-scale count of every ADC reading.  `HardwarePort::read_adc`
/// always reports on a 16-bit scale, whatever the converter's width.
pub const ADC_DEVICE_MAX: u16 = u16::MAX;

// ---------------------------------------------------------------------------
// Indicator LEDs
// ---------------------------------------------------------------------------

/// Red LED: any sensor out of band.
pub const ALERT_LED_GPIO: u8 = 15;
/// Green LED: all sensors in band.
pub const OK_LED_GPIO: u8 = 14;

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

/// Top-up pump relay.  HIGH = pump running.
pub const PUMP_RELAY_GPIO: u8 = 16;

/// SG90 feeder servo signal line.
pub const FEEDER_SERVO_GPIO: u8 = 18;
/// Standard hobby-servo frame rate.
pub const FEEDER_SERVO_PWM_HZ: u32 = 50;

//! Hardware adapters: the only code that touches pins and buses.
//!
//! - [`EspHardware`] (`target_os = "espidf"`) drives ADC1, GPIO, LEDC and
//!   bit-banged 1-Wire through [`hw_init`](crate::drivers::hw_init).
//! - [`SimHardware`] (host) keeps every output in memory and serves
//!   injectable sensor values, so the firmware runs unmodified on a
//!   workstation.

#[cfg(not(target_os = "espidf"))]
pub use sim::SimHardware;

#[cfg(target_os = "espidf")]
pub use esp::EspHardware;

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::collections::HashMap;

    use log::{debug, info};

    use crate::app::ports::{HardwarePort, Level, PwmHandle};
    use crate::config::SystemConfig;
    use crate::error::HwError;
    use crate::pins;

    /// In-memory board.  Unset ADC channels and an unset temperature read
    /// as "no device".
    #[derive(Debug, Default)]
    pub struct SimHardware {
        adc: HashMap<u8, u16>,
        temperature: Option<f32>,
        failing_pins: Vec<u8>,
        outputs: HashMap<u8, Level>,
        /// Pin and current duty per PWM handle.
        pwm: Vec<(u8, f32)>,
        released: bool,
    }

    impl SimHardware {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every probe in `config` reads the middle of its band.
        pub fn nominal(config: &SystemConfig) -> Self {
            let mut hw = Self::new();
            let t = &config.sensors.temperature;
            hw.temperature = Some((t.band.low + t.band.high) / 2.0);
            let level = &config.sensors.level;
            hw.set_adc(level.channel, pins::ADC_DEVICE_MAX / 2);
            // The pH proxy spans 0 to 11.55, so aim the raw count at the
            // centre of the pH band.
            let ph = &config.sensors.ph;
            let target = (ph.band.low + ph.band.high) / 2.0;
            let frac = (target / (3.3 * 3.5)).clamp(0.0, 1.0);
            hw.set_adc(ph.channel, (frac * f32::from(pins::ADC_DEVICE_MAX)) as u16);
            hw
        }

        pub fn set_adc(&mut self, channel: u8, raw: u16) {
            self.adc.insert(channel, raw);
        }

        pub fn set_temperature(&mut self, celsius: Option<f32>) {
            self.temperature = celsius;
        }

        /// Make every write to `pin` fail with `NotAcknowledged`.
        pub fn fail_pin(&mut self, pin: u8) {
            self.failing_pins.push(pin);
        }

        pub fn output(&self, pin: u8) -> Option<Level> {
            self.outputs.get(&pin).copied()
        }

        pub fn duty(&self, pin: u8) -> Option<f32> {
            self.pwm.iter().find(|(p, _)| *p == pin).map(|(_, d)| *d)
        }

        pub fn is_released(&self) -> bool {
            self.released
        }

        fn check(&self, pin: u8) -> Result<(), HwError> {
            if self.failing_pins.contains(&pin) {
                Err(HwError::NotAcknowledged)
            } else {
                Ok(())
            }
        }
    }

    impl HardwarePort for SimHardware {
        fn configure_output(&mut self, pin: u8) -> Result<(), HwError> {
            self.outputs.insert(pin, Level::Low);
            self.released = false;
            debug!("sim: GPIO{} output", pin);
            Ok(())
        }

        fn configure_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<PwmHandle, HwError> {
            let handle = PwmHandle(self.pwm.len() as u8);
            self.pwm.push((pin, 0.0));
            self.released = false;
            debug!("sim: GPIO{} PWM {} Hz as {:?}", pin, frequency_hz, handle);
            Ok(handle)
        }

        fn set_duty_cycle(&mut self, pwm: PwmHandle, percent: f32) -> Result<(), HwError> {
            let pin = self
                .pwm
                .get(usize::from(pwm.0))
                .map(|(p, _)| *p)
                .ok_or(HwError::NotConfigured(pwm.0))?;
            self.check(pin)?;
            self.pwm[usize::from(pwm.0)].1 = percent;
            debug!("sim: GPIO{} duty {:.2}%", pin, percent);
            Ok(())
        }

        fn set_digital(&mut self, pin: u8, level: Level) -> Result<(), HwError> {
            self.check(pin)?;
            let slot = self
                .outputs
                .get_mut(&pin)
                .ok_or(HwError::NotConfigured(pin))?;
            *slot = level;
            Ok(())
        }

        fn read_adc(&mut self, channel: u8) -> Result<u16, HwError> {
            self.adc.get(&channel).copied().ok_or(HwError::NoDevice)
        }

        fn begin_onewire_conversion(&mut self, _bus: u8) -> Result<(), HwError> {
            self.temperature.map(|_| ()).ok_or(HwError::NoDevice)
        }

        fn read_onewire_temperature(&mut self, _bus: u8) -> Result<f32, HwError> {
            self.temperature.ok_or(HwError::NoDevice)
        }

        fn release(&mut self) -> Result<(), HwError> {
            for level in self.outputs.values_mut() {
                *level = Level::Low;
            }
            for (_, duty) in &mut self.pwm {
                *duty = 0.0;
            }
            self.released = true;
            info!("sim: all outputs released");
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn writes_need_a_claimed_pin() {
            let mut hw = SimHardware::new();
            assert_eq!(
                hw.set_digital(16, Level::High),
                Err(HwError::NotConfigured(16))
            );
            hw.configure_output(16).unwrap();
            hw.set_digital(16, Level::High).unwrap();
            assert_eq!(hw.output(16), Some(Level::High));
        }

        #[test]
        fn release_drives_everything_low() {
            let mut hw = SimHardware::new();
            hw.configure_output(16).unwrap();
            hw.set_digital(16, Level::High).unwrap();
            let pwm = hw.configure_pwm(18, 50).unwrap();
            hw.set_duty_cycle(pwm, 7.5).unwrap();
            hw.release().unwrap();
            assert!(hw.is_released());
            assert_eq!(hw.output(16), Some(Level::Low));
            assert_eq!(hw.duty(18), Some(0.0));
        }

        #[test]
        fn nominal_reads_inside_every_band() {
            use crate::app::service::verdicts;
            use crate::sensors::{
                Probe, SensorHub, ph::PhProbe, temperature::TemperatureProbe,
                water_level::LevelProbe,
            };
            use crate::app::fake::FakeClock;

            let config = SystemConfig::water_quality();
            let mut hw = SimHardware::nominal(&config);
            let mut hub = SensorHub::new(0);
            let s = &config.sensors;
            let _ = hub.add(Probe::Temperature(TemperatureProbe::new(
                s.temperature.channel,
                config.temperature_settle(),
            )));
            let _ = hub.add(Probe::Ph(PhProbe::new(s.ph.channel, pins::ADC_DEVICE_MAX)));
            let _ = hub.add(Probe::Level(LevelProbe::new(s.level.channel, pins::ADC_DEVICE_MAX)));
            let snapshot = hub.read_all(&mut hw, &mut FakeClock::at(0, 0));
            let v = verdicts(&snapshot, &config);
            assert!(v.values().all(|v| v.is_some_and(|v| v.is_normal())));
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP32 board
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use log::{info, warn};

    use crate::app::ports::{HardwarePort, Level, PwmHandle};
    use crate::drivers::hw_init::{self, HwInitError};
    use crate::drivers::onewire::OneWireBus;
    use crate::error::HwError;

    const MAX_OUTPUTS: usize = 8;
    const MAX_PWM: usize = 4;
    const MAX_BUSES: usize = 2;

    pub struct EspHardware {
        outputs: heapless::Vec<u8, MAX_OUTPUTS>,
        /// GPIO per LEDC channel; the index is the channel number.
        pwm: heapless::Vec<u8, MAX_PWM>,
        buses: heapless::Vec<(u8, OneWireBus), MAX_BUSES>,
    }

    impl EspHardware {
        /// Bring up ADC1 for `adc_channels`.  GPIO and LEDC are claimed
        /// lazily by the port calls.
        pub fn new(adc_channels: &[u8]) -> Result<Self, HwInitError> {
            hw_init::init_adc(adc_channels)?;
            Ok(Self {
                outputs: heapless::Vec::new(),
                pwm: heapless::Vec::new(),
                buses: heapless::Vec::new(),
            })
        }

        fn bus(&mut self, pin: u8) -> Result<&mut OneWireBus, HwError> {
            let idx = match self.buses.iter().position(|(p, _)| *p == pin) {
                Some(idx) => idx,
                None => {
                    let bus = OneWireBus::new(pin)?;
                    self.buses
                        .push((pin, bus))
                        .map_err(|_| HwError::NotConfigured(pin))?;
                    info!("1-Wire bus on GPIO{}", pin);
                    self.buses.len() - 1
                }
            };
            Ok(&mut self.buses[idx].1)
        }
    }

    impl HardwarePort for EspHardware {
        fn configure_output(&mut self, pin: u8) -> Result<(), HwError> {
            hw_init::config_output(pin).map_err(|e| {
                warn!("GPIO{}: {}", pin, e);
                HwError::NotConfigured(pin)
            })?;
            if hw_init::gpio_write(pin, false) != 0 {
                return Err(HwError::NotAcknowledged);
            }
            if !self.outputs.contains(&pin) {
                self.outputs
                    .push(pin)
                    .map_err(|_| HwError::NotConfigured(pin))?;
            }
            Ok(())
        }

        fn configure_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<PwmHandle, HwError> {
            let channel = self.pwm.len() as u32;
            if self.pwm.is_full() {
                return Err(HwError::NotConfigured(pin));
            }
            hw_init::ledc_setup(channel, channel, pin, frequency_hz).map_err(|e| {
                warn!("GPIO{}: {}", pin, e);
                HwError::NotConfigured(pin)
            })?;
            let _ = self.pwm.push(pin);
            Ok(PwmHandle(channel as u8))
        }

        fn set_duty_cycle(&mut self, pwm: PwmHandle, percent: f32) -> Result<(), HwError> {
            if usize::from(pwm.0) >= self.pwm.len() {
                return Err(HwError::NotConfigured(pwm.0));
            }
            match hw_init::ledc_set_percent(u32::from(pwm.0), percent) {
                0 => Ok(()),
                _ => Err(HwError::NotAcknowledged),
            }
        }

        fn set_digital(&mut self, pin: u8, level: Level) -> Result<(), HwError> {
            if !self.outputs.contains(&pin) {
                return Err(HwError::NotConfigured(pin));
            }
            match hw_init::gpio_write(pin, level == Level::High) {
                0 => Ok(()),
                _ => Err(HwError::NotAcknowledged),
            }
        }

        fn read_adc(&mut self, channel: u8) -> Result<u16, HwError> {
            hw_init::adc1_read(channel)
                .map(hw_init::adc_to_u16)
                .map_err(|_| HwError::BusFault)
        }

        fn begin_onewire_conversion(&mut self, bus: u8) -> Result<(), HwError> {
            self.bus(bus)?.start_conversion()
        }

        fn read_onewire_temperature(&mut self, bus: u8) -> Result<f32, HwError> {
            self.bus(bus)?.read_temperature()
        }

        fn release(&mut self) -> Result<(), HwError> {
            for channel in 0..self.pwm.len() as u32 {
                hw_init::ledc_halt(channel);
            }
            for &pin in &self.outputs {
                hw_init::gpio_write(pin, false);
                hw_init::gpio_release(pin);
            }
            for (pin, _) in &self.buses {
                hw_init::gpio_release(*pin);
            }
            self.pwm.clear();
            self.outputs.clear();
            self.buses.clear();
            info!("hardware released");
            Ok(())
        }
    }
}

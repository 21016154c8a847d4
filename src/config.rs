//! System configuration parameters.
//!
//! Loaded once at startup (JSON file or a named preset), validated, and
//! then passed by shared reference into the control loop.  Nothing mutates
//! it afterwards.
//!
//! Three presets match the deployments the firmware ships for:
//!
//! | Preset            | Sensors              | Actuator | Cadence |
//! |-------------------|----------------------|----------|---------|
//! | `water_quality`   | temperature, pH, lvl | none     | 2 s     |
//! | `pump_station`    | level                | pump     | 1 s     |
//! | `fish_feeder`     | none                 | feeder   | 1 s     |

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drivers::pump::HoldPolicy;
use crate::error::Error;
use crate::pins;
use crate::scheduler::FeedingSchedule;
use crate::sensors::SensorKind;
use crate::threshold::ThresholdBand;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One probe.  `channel` is the ADC channel for pH/level and the 1-Wire
/// GPIO for temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub enabled: bool,
    pub band: ThresholdBand,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorTable {
    pub temperature: SensorConfig,
    pub ph: SensorConfig,
    pub level: SensorConfig,
}

impl SensorTable {
    pub fn get(&self, kind: SensorKind) -> &SensorConfig {
        match kind {
            SensorKind::Temperature => &self.temperature,
            SensorKind::Ph => &self.ph,
            SensorKind::Level => &self.level,
        }
    }

    /// Enabled sensors in fixed order.
    pub fn enabled(&self) -> impl Iterator<Item = (SensorKind, &SensorConfig)> {
        SensorKind::ALL
            .into_iter()
            .map(|k| (k, self.get(k)))
            .filter(|(_, c)| c.enabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLedConfig {
    pub alert_pin: u8,
    pub ok_pin: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpConfig {
    pub pin: u8,
    #[serde(default)]
    pub hold_policy: HoldPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederConfig {
    pub pin: u8,
    pub pwm_frequency_hz: u32,
    pub open_angle_deg: f32,
    pub closed_angle_deg: f32,
    /// Time the gate stays open.
    pub dwell_ms: u32,
    /// Time allowed for the gate to close before the servo is released.
    pub settle_ms: u32,
    pub schedule: FeedingSchedule,
}

impl FeederConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(u64::from(self.dwell_ms))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(u64::from(self.settle_ms))
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// Core system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    pub sensors: SensorTable,
    /// Consecutive failed reads covered by the last good sample.
    pub stale_limit: u32,
    /// DS18B20 conversion wait.
    pub temperature_settle_ms: u32,
    /// Sleep between control iterations.
    pub poll_interval_ms: u32,
    pub leds: AlertLedConfig,
    pub pump: Option<PumpConfig>,
    pub feeder: Option<FeederConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::water_quality()
    }
}

impl SystemConfig {
    fn base() -> Self {
        Self {
            sensors: SensorTable {
                temperature: SensorConfig {
                    enabled: false,
                    band: ThresholdBand::new(30.0, 35.0),
                    channel: pins::TEMP_ONEWIRE_GPIO,
                },
                ph: SensorConfig {
                    enabled: false,
                    band: ThresholdBand::new(6.5, 8.5),
                    channel: pins::PH_ADC_CHANNEL,
                },
                level: SensorConfig {
                    enabled: false,
                    band: ThresholdBand::new(20.0, 80.0),
                    channel: pins::LEVEL_ADC_CHANNEL,
                },
            },
            stale_limit: 3,
            temperature_settle_ms: 750,
            poll_interval_ms: 1000,
            leds: AlertLedConfig {
                alert_pin: pins::ALERT_LED_GPIO,
                ok_pin: pins::OK_LED_GPIO,
            },
            pump: None,
            feeder: None,
        }
    }

    /// Temperature, pH and level monitoring with the LED display.
    pub fn water_quality() -> Self {
        let mut c = Self::base();
        c.sensors.temperature.enabled = true;
        c.sensors.ph.enabled = true;
        c.sensors.level.enabled = true;
        c.poll_interval_ms = 2000;
        c
    }

    /// Level-driven top-up pump.
    pub fn pump_station() -> Self {
        let mut c = Self::base();
        c.sensors.level.enabled = true;
        c.sensors.level.band = ThresholdBand::new(30.0, 70.0);
        c.pump = Some(PumpConfig {
            pin: pins::PUMP_RELAY_GPIO,
            hold_policy: HoldPolicy::Hold,
        });
        c
    }

    /// Scheduled feeder, three meals a day.
    pub fn fish_feeder() -> Self {
        let mut c = Self::base();
        c.feeder = Some(FeederConfig {
            pin: pins::FEEDER_SERVO_GPIO,
            pwm_frequency_hz: pins::FEEDER_SERVO_PWM_HZ,
            open_angle_deg: 90.0,
            closed_angle_deg: 0.0,
            dwell_ms: 2000,
            settle_ms: 1000,
            schedule: FeedingSchedule::daily(),
        });
        c
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "water_quality" => Some(Self::water_quality()),
            "pump_station" => Some(Self::pump_station()),
            "fish_feeder" => Some(Self::fish_feeder()),
            _ => None,
        }
    }

    /// Parse JSON and validate.  Missing fields take the `water_quality`
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            log::error!("config: {}", e);
            Error::Config("malformed configuration JSON")
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }

    pub fn temperature_settle(&self) -> Duration {
        Duration::from_millis(u64::from(self.temperature_settle_ms))
    }

    /// Longest single blocking step of one iteration.
    pub fn longest_step(&self) -> Duration {
        let feed = self
            .feeder
            .as_ref()
            .map_or(Duration::ZERO, |f| f.dwell() + f.settle());
        feed + self.temperature_settle() + self.poll_interval()
    }

    /// Reject inconsistent values.  Never clamps.
    pub fn validate(&self) -> Result<(), Error> {
        for kind in SensorKind::ALL {
            if !self.sensors.get(kind).band.is_valid() {
                return Err(Error::Config("threshold band must be finite with low <= high"));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero"));
        }
        if self.pump.is_some() && !self.sensors.level.enabled {
            return Err(Error::Config("pump requires the level sensor"));
        }
        if let Some(f) = &self.feeder {
            if f.schedule.is_empty() {
                return Err(Error::Config("feeder schedule is empty"));
            }
            let angle_ok = |a: f32| (0.0..=180.0).contains(&a);
            if !angle_ok(f.open_angle_deg) || !angle_ok(f.closed_angle_deg) {
                return Err(Error::Config("servo angles must be within 0..=180"));
            }
            if f.pwm_frequency_hz == 0 {
                return Err(Error::Config("pwm_frequency_hz must be non-zero"));
            }
        }
        self.check_pin_collisions()
    }

    fn check_pin_collisions(&self) -> Result<(), Error> {
        let mut claimed: heapless::Vec<u8, 5> = heapless::Vec::new();
        let mut claim = |pin: u8| -> Result<(), Error> {
            if claimed.contains(&pin) {
                return Err(Error::Config("two outputs share a GPIO"));
            }
            claimed
                .push(pin)
                .map_err(|_| Error::Config("too many GPIO claims"))
        };
        claim(self.leds.alert_pin)?;
        claim(self.leds.ok_pin)?;
        if self.sensors.temperature.enabled {
            claim(self.sensors.temperature.channel)?;
        }
        if let Some(p) = &self.pump {
            claim(p.pin)?;
        }
        if let Some(f) = &self.feeder {
            claim(f.pin)?;
        }
        Ok(())
    }
}
